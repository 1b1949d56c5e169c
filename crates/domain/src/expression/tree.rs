use calc_core::{ExpressionError, Operation};
use serde::Serialize;

use super::Token;

/// 括号带来的优先级偏移
const BRACKET_PENALTY: i32 = 10;

/// 表达式二叉树：内部节点都是二元运算，叶子都是数值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExprNode {
    Leaf {
        value: f64,
    },
    Operator {
        operation: Operation,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
}

impl ExprNode {
    pub fn leaf(value: f64) -> Self {
        ExprNode::Leaf { value }
    }

    pub fn operator(operation: Operation, left: ExprNode, right: ExprNode) -> Self {
        ExprNode::Operator {
            operation,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// 本地求值，除零返回None
    pub fn evaluate(&self) -> Option<f64> {
        match self {
            ExprNode::Leaf { value } => Some(*value),
            ExprNode::Operator {
                operation,
                left,
                right,
            } => {
                let first = left.evaluate()?;
                let second = right.evaluate()?;
                if *operation == Operation::Divide && second == 0.0 {
                    return None;
                }
                Some(operation.apply(first, second))
            }
        }
    }

    /// 运算节点数量
    pub fn operator_count(&self) -> usize {
        match self {
            ExprNode::Leaf { .. } => 0,
            ExprNode::Operator { left, right, .. } => {
                1 + left.operator_count() + right.operator_count()
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            ExprNode::Leaf { .. } => 1,
            ExprNode::Operator { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// 按运算符优先级扫描构建二叉树
///
/// 每层括号给其中的运算符加 10 的优先级偏移，取有效优先级最小者作为根：
/// 顶层加减（有效优先级恰为1）无条件覆盖候选，最右者胜出，保证加减链左结合；
/// 其余运算符只在严格更小时替换候选，最左者胜出。
/// 整个窗口被一对括号包裹时去掉外层括号后重新扫描。
pub fn build(tokens: &[Token]) -> Result<ExprNode, ExpressionError> {
    let mut window = tokens;

    loop {
        match window {
            [] => return Err(ExpressionError::Empty),
            [Token::Number(value)] => return Ok(ExprNode::leaf(*value)),
            [_] => return Err(ExpressionError::InvalidOperatorPlacement { position: 0 }),
            _ => {}
        }

        let last = window.len() - 1;
        let mut wrapped = window[0] == Token::OpenBracket;
        let mut depth: i32 = 0;
        let mut penalty: i32 = 0;
        let mut split: Option<(usize, i32)> = None;

        for (index, token) in window.iter().enumerate() {
            match token {
                Token::Operator(operation) => {
                    let priority = operation.priority() + penalty;
                    if priority == 1 {
                        split = Some((index, priority));
                        continue;
                    }
                    match split {
                        Some((_, lowest)) if priority >= lowest => {}
                        _ => split = Some((index, priority)),
                    }
                }
                Token::OpenBracket => {
                    depth += 1;
                    penalty += BRACKET_PENALTY;
                }
                Token::CloseBracket => {
                    depth -= 1;
                    if index != 0 && index != last && depth == 0 {
                        wrapped = false;
                    }
                    penalty -= BRACKET_PENALTY;
                }
                Token::Number(_) => {}
            }
        }

        if depth != 0 {
            return Err(ExpressionError::UnbalancedParentheses);
        }

        if wrapped {
            window = &window[1..last];
            continue;
        }

        let (index, _) = split.ok_or(ExpressionError::InvalidOperatorPlacement { position: 0 })?;
        let operation = window[index]
            .operation()
            .ok_or(ExpressionError::InvalidOperatorPlacement { position: index })?;

        let left = build(&window[..index])?;
        let right = build(&window[index + 1..])?;

        return Ok(ExprNode::operator(operation, left, right));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{tokenize, validate};

    fn tree(text: &str) -> ExprNode {
        let normalized = validate(text).unwrap();
        build(&tokenize(&normalized).unwrap()).unwrap()
    }

    fn root_operation(node: &ExprNode) -> Operation {
        match node {
            ExprNode::Operator { operation, .. } => *operation,
            ExprNode::Leaf { .. } => panic!("expected operator root"),
        }
    }

    #[test]
    fn test_single_literal() {
        assert_eq!(tree("42"), ExprNode::leaf(42.0));
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let root = tree("1+2*3");
        assert_eq!(
            root,
            ExprNode::operator(
                Operation::Add,
                ExprNode::leaf(1.0),
                ExprNode::operator(Operation::Multiply, ExprNode::leaf(2.0), ExprNode::leaf(3.0)),
            )
        );
        assert_eq!(root.evaluate(), Some(7.0));
    }

    #[test]
    fn test_additive_chain_is_left_associative() {
        let root = tree("10-2-3");
        assert_eq!(
            root,
            ExprNode::operator(
                Operation::Subtract,
                ExprNode::operator(Operation::Subtract, ExprNode::leaf(10.0), ExprNode::leaf(2.0)),
                ExprNode::leaf(3.0),
            )
        );
        assert_eq!(root.evaluate(), Some(5.0));
    }

    #[test]
    fn test_outer_brackets_are_stripped() {
        assert_eq!(tree("(5+5)"), tree("5+5"));
        assert_eq!(tree("((1+2)*3)"), tree("(1+2)*3"));
    }

    #[test]
    fn test_brackets_not_wrapping_whole_window() {
        let root = tree("(1+2)*(3+4)");
        assert_eq!(root_operation(&root), Operation::Multiply);
        assert_eq!(root.evaluate(), Some(21.0));
    }

    #[test]
    fn test_nested_expression() {
        let root = tree("2*(3+4)-1");
        assert_eq!(root_operation(&root), Operation::Subtract);
        assert_eq!(root.operator_count(), 3);
        assert_eq!(root.depth(), 4);
        assert_eq!(root.evaluate(), Some(13.0));
    }

    #[test]
    fn test_multiplicative_chain_picks_leftmost_operator() {
        // 现有分组规则：8/4/2 → 8/(4/2)
        let root = tree("8/4/2");
        assert_eq!(
            root,
            ExprNode::operator(
                Operation::Divide,
                ExprNode::leaf(8.0),
                ExprNode::operator(Operation::Divide, ExprNode::leaf(4.0), ExprNode::leaf(2.0)),
            )
        );
        assert_eq!(root.evaluate(), Some(4.0));
    }

    #[test]
    fn test_build_rejects_malformed_windows() {
        assert_eq!(build(&[]), Err(ExpressionError::Empty));
        assert!(matches!(
            build(&[Token::Number(1.0), Token::Number(2.0)]),
            Err(ExpressionError::InvalidOperatorPlacement { .. })
        ));
        assert!(matches!(
            build(&[Token::Operator(Operation::Add)]),
            Err(ExpressionError::InvalidOperatorPlacement { .. })
        ));
    }

    #[test]
    fn test_tree_serializes_with_kind_tag() {
        let json = serde_json::to_value(tree("1+2")).unwrap();
        assert_eq!(json["kind"], "operator");
        assert_eq!(json["operation"], "add");
        assert_eq!(json["left"]["value"], 1.0);
    }

    #[test]
    fn test_deeply_wrapped_literal_does_not_recurse() {
        let depth = 2_000;
        let mut tokens = vec![Token::OpenBracket; depth];
        tokens.extend([
            Token::Number(1.0),
            Token::Operator(Operation::Add),
            Token::Number(1.0),
        ]);
        tokens.extend(vec![Token::CloseBracket; depth]);

        let root = build(&tokens).unwrap();
        assert_eq!(root.evaluate(), Some(2.0));
        assert_eq!(root.depth(), 2);
    }

    #[test]
    fn test_parse_rejects_nesting_beyond_limit() {
        let text = format!("{}1+1{}", "(".repeat(20_000), ")".repeat(20_000));
        assert!(matches!(
            crate::expression::parse(&text),
            Err(ExpressionError::NestingTooDeep { .. })
        ));
    }
}
