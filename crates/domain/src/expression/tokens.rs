use calc_core::Operation;
use serde::Serialize;

/// 词法单元
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Token {
    Number(f64),
    Operator(Operation),
    OpenBracket,
    CloseBracket,
}

impl Token {
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Token::Operator(operation) => Some(*operation),
            _ => None,
        }
    }
}
