pub mod expression;
pub mod task_tree_store;

pub use expression::{build, parse, tokenize, validate, ExprNode, Token};
pub use task_tree_store::TaskTreeStore;
