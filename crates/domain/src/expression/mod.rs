//! 表达式编译：文本校验 → 词法切分 → 二叉树构建

pub mod parser;
pub mod tokens;
pub mod tree;

pub use parser::{tokenize, validate};
pub use tokens::Token;
pub use tree::{build, ExprNode};

use calc_core::ExpressionError;

/// 从原始文本直接得到表达式树
pub fn parse(text: &str) -> Result<ExprNode, ExpressionError> {
    let normalized = validate(text)?;
    let tokens = tokenize(&normalized)?;
    build(&tokens)
}
