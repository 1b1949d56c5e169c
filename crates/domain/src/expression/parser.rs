use calc_core::{ExpressionError, Operation};

use super::Token;

/// 括号最大嵌套层数
pub const MAX_NESTING_DEPTH: usize = 64;

/// 单个表达式的最大运算符数，同时限制了树的深度
pub const MAX_OPERATORS: usize = 256;

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn is_operator(c: char) -> bool {
    Operation::from_symbol(c).is_some()
}

fn is_legal(c: char) -> bool {
    is_number_char(c) || is_operator(c) || c == '(' || c == ')' || c.is_whitespace()
}

/// 校验表达式并返回规范化文本
///
/// 规范化会去掉空白，并在数字紧跟左括号处补上乘号（`2(3+4)` → `2*(3+4)`）。
/// 位置以去掉首尾空白后的字符下标计。
pub fn validate(text: &str) -> Result<String, ExpressionError> {
    let chars: Vec<char> = text.trim().chars().collect();
    let mut normalized = String::with_capacity(chars.len() + 4);
    let mut last: Option<char> = None;
    let mut open_brackets: i32 = 0;
    let mut operators: usize = 0;

    for (position, &c) in chars.iter().enumerate() {
        if !is_legal(c) {
            return Err(ExpressionError::UnknownSymbol {
                symbol: c,
                position,
            });
        }

        if c.is_whitespace() {
            continue;
        }

        if is_operator(c) {
            let unary_minus = c == '-' && matches!(last, None | Some('('));
            match last {
                Some(prev) if is_operator(prev) => {
                    return Err(ExpressionError::InvalidOperatorPlacement { position });
                }
                None | Some('(') if !unary_minus => {
                    return Err(ExpressionError::InvalidOperatorPlacement { position });
                }
                _ => {}
            }

            let next = chars[position + 1..]
                .iter()
                .copied()
                .find(|n| !n.is_whitespace());
            if matches!(next, None | Some(')')) {
                return Err(ExpressionError::InvalidOperatorPlacement { position });
            }

            // 行首一元负号并入字面量，不构成运算节点
            if !unary_minus {
                operators += 1;
                if operators > MAX_OPERATORS {
                    return Err(ExpressionError::TooManyOperators {
                        limit: MAX_OPERATORS,
                    });
                }
            }
        }

        // 右括号后只能接运算符或右括号
        if last == Some(')') && (is_number_char(c) || c == '(') {
            return Err(ExpressionError::InvalidOperatorPlacement { position });
        }

        match c {
            '(' => {
                open_brackets += 1;
                if open_brackets as usize > MAX_NESTING_DEPTH {
                    return Err(ExpressionError::NestingTooDeep {
                        limit: MAX_NESTING_DEPTH,
                    });
                }
                if matches!(last, Some(prev) if is_number_char(prev)) {
                    normalized.push('*');
                }
            }
            ')' => {
                open_brackets -= 1;
                if open_brackets < 0 {
                    return Err(ExpressionError::UnbalancedParentheses);
                }
                if last == Some('(') {
                    return Err(ExpressionError::Empty);
                }
            }
            _ => {}
        }

        normalized.push(c);
        last = Some(c);
    }

    if normalized.is_empty() {
        return Err(ExpressionError::Empty);
    }

    if open_brackets != 0 {
        return Err(ExpressionError::UnbalancedParentheses);
    }

    Ok(normalized)
}

/// 把规范化文本切分为词法单元
///
/// 行首或紧跟左括号的 `-` 视为数字符号，并入随后的字面量。
pub fn tokenize(normalized: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();

    for (position, c) in normalized.chars().enumerate() {
        let leading_sign = c == '-'
            && literal.is_empty()
            && matches!(tokens.last(), None | Some(Token::OpenBracket));

        if is_number_char(c) || leading_sign {
            literal.push(c);
            continue;
        }

        flush_literal(&mut literal, &mut tokens)?;

        let token = match c {
            '(' => Token::OpenBracket,
            ')' => Token::CloseBracket,
            _ => match Operation::from_symbol(c) {
                Some(operation) => Token::Operator(operation),
                None => {
                    return Err(ExpressionError::UnknownSymbol {
                        symbol: c,
                        position,
                    })
                }
            },
        };
        tokens.push(token);
    }

    flush_literal(&mut literal, &mut tokens)?;

    Ok(tokens)
}

fn flush_literal(literal: &mut String, tokens: &mut Vec<Token>) -> Result<(), ExpressionError> {
    if literal.is_empty() {
        return Ok(());
    }

    // 超出f64范围的字面量会被解析成inf，同样视为格式错误
    let value = literal
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ExpressionError::MalformedNumber(literal.clone()))?;
    tokens.push(Token::Number(value));
    literal.clear();
    Ok(())
}
