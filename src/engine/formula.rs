// src/engine/formula.rs

//! Avaliador das fórmulas dos campos de cálculo.
//!
//! Uma fórmula é uma expressão aritmética sobre números decimais, `+ - * /`,
//! parênteses, menos unário e placeholders `{{<fieldId>}}` que apontam para
//! outros campos numéricos do mesmo tipo de objeto.
//!
//! O pipeline é: tokenizar -> converter para RPN (shunting-yard) -> avaliar a
//! pilha. Nada aqui faz I/O.

use std::collections::HashMap;

use serde::Serialize;

use crate::engine::error::FieldValueError;
use crate::models::custom_field::FieldId;

pub const DIVISION_BY_ZERO_WARNING: &str = "division by zero — result not stored";

/// Resultado público de uma avaliação.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub value: Option<f64>,
    pub warnings: Vec<String>,
}

/// Resultado interno, mais rico que o `Evaluation`.
///
/// `Malformed` e `Incomplete` viram o mesmo `{ value: null, warnings: [] }` para
/// quem chama, mas continuam distinguíveis aqui (e no log).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormulaOutcome {
    Value(f64),
    /// Algum campo referenciado está nulo ou ausente.
    Incomplete,
    DivisionByZero,
    Malformed,
    /// A conta estourou para infinito/NaN.
    NonFinite,
}

impl From<FormulaOutcome> for Evaluation {
    fn from(outcome: FormulaOutcome) -> Self {
        match outcome {
            FormulaOutcome::Value(value) => Evaluation { value: Some(value), warnings: Vec::new() },
            FormulaOutcome::DivisionByZero => Evaluation {
                value: None,
                warnings: vec![DIVISION_BY_ZERO_WARNING.to_string()],
            },
            FormulaOutcome::Incomplete | FormulaOutcome::Malformed | FormulaOutcome::NonFinite => {
                Evaluation { value: None, warnings: Vec::new() }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
}

impl Operator {
    fn precedence(self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 1,
            Operator::Mul | Operator::Div => 2,
            Operator::Neg => 3,
        }
    }

    fn is_right_assoc(self) -> bool {
        matches!(self, Operator::Neg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Field(FieldId),
    Op(Operator),
    LParen,
    RParen,
}

// =========================================================================
//  PLACEHOLDERS
// =========================================================================

/// Procura `{{123}}` e devolve (início, fim, id) de cada ocorrência.
fn scan_placeholders(formula: &str) -> Vec<(usize, usize, FieldId)> {
    let bytes = formula.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            let digits_start = i + 2;
            let mut j = digits_start;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            let closed = j + 1 < bytes.len() && bytes[j] == b'}' && bytes[j + 1] == b'}';
            if j > digits_start && closed {
                if let Ok(id) = formula[digits_start..j].parse::<FieldId>() {
                    found.push((i, j + 2, id));
                    i = j + 2;
                    continue;
                }
            }
        }
        i += 1;
    }

    found
}

/// Ids referenciados pela fórmula, sem repetição, na ordem em que aparecem.
pub fn references(formula: &str) -> Vec<FieldId> {
    let mut ids = Vec::new();
    for (_, _, id) in scan_placeholders(formula) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

fn substitute_placeholders(formula: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(formula.len());
    let mut cursor = 0;
    for (start, end, _) in scan_placeholders(formula) {
        out.push_str(&formula[cursor..start]);
        out.push_str(replacement);
        cursor = end;
    }
    out.push_str(&formula[cursor..]);
    out
}

// =========================================================================
//  TOKENIZER / PARSER
// =========================================================================

fn tokenize(formula: &str) -> Option<Vec<Token>> {
    let bytes = formula.as_bytes();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == b'.' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            let number: f64 = formula[start..i].parse().ok()?;
            tokens.push(Token::Number(number));
            continue;
        }

        if c == b'{' {
            let digits_start = i + 2;
            if bytes.get(i + 1) != Some(&b'{') {
                return None;
            }
            let mut j = digits_start;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j == digits_start || bytes.get(j) != Some(&b'}') || bytes.get(j + 1) != Some(&b'}') {
                return None;
            }
            tokens.push(Token::Field(formula[digits_start..j].parse().ok()?));
            i = j + 2;
            continue;
        }

        let token = match c {
            b'+' => Token::Op(Operator::Add),
            b'-' => {
                // Menos unário: início da expressão, depois de operador ou de '('
                let unary = matches!(tokens.last(), None | Some(Token::Op(_)) | Some(Token::LParen));
                Token::Op(if unary { Operator::Neg } else { Operator::Sub })
            }
            b'*' => Token::Op(Operator::Mul),
            b'/' => Token::Op(Operator::Div),
            b'(' => Token::LParen,
            b')' => Token::RParen,
            _ => return None,
        };
        tokens.push(token);
        i += 1;
    }

    Some(tokens)
}

fn to_rpn(tokens: Vec<Token>) -> Option<Vec<Token>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(_) | Token::Field(_) => output.push(token),
            Token::Op(op) => {
                while let Some(Token::Op(top)) = stack.last().copied() {
                    let pops = top.precedence() > op.precedence()
                        || (top.precedence() == op.precedence() && !op.is_right_assoc());
                    if !pops {
                        break;
                    }
                    output.push(Token::Op(top));
                    stack.pop();
                }
                stack.push(token);
            }
            Token::LParen => stack.push(token),
            Token::RParen => loop {
                match stack.pop() {
                    Some(Token::LParen) => break,
                    Some(other) => output.push(other),
                    None => return None,
                }
            },
        }
    }

    while let Some(token) = stack.pop() {
        if token == Token::LParen {
            return None;
        }
        output.push(token);
    }

    Some(output)
}

fn eval_rpn(rpn: &[Token], values: &HashMap<FieldId, f64>) -> FormulaOutcome {
    let mut stack: Vec<f64> = Vec::with_capacity(rpn.len());

    for token in rpn {
        match *token {
            Token::Number(n) => stack.push(n),
            Token::Field(id) => match values.get(&id) {
                Some(v) => stack.push(*v),
                None => return FormulaOutcome::Incomplete,
            },
            Token::Op(Operator::Neg) => match stack.pop() {
                Some(a) => stack.push(-a),
                None => return FormulaOutcome::Malformed,
            },
            Token::Op(op) => {
                let (Some(b), Some(a)) = (stack.pop(), stack.pop()) else {
                    return FormulaOutcome::Malformed;
                };
                let result = match op {
                    Operator::Add => a + b,
                    Operator::Sub => a - b,
                    Operator::Mul => a * b,
                    Operator::Div => {
                        if b == 0.0 {
                            return FormulaOutcome::DivisionByZero;
                        }
                        a / b
                    }
                    Operator::Neg => unreachable!("tratado acima"),
                };
                stack.push(result);
            }
            Token::LParen | Token::RParen => return FormulaOutcome::Malformed,
        }
    }

    match stack.as_slice() {
        [value] if value.is_finite() => FormulaOutcome::Value(*value),
        [_] => FormulaOutcome::NonFinite,
        _ => FormulaOutcome::Malformed,
    }
}

// =========================================================================
//  API
// =========================================================================

/// Avalia a fórmula devolvendo o resultado detalhado.
pub fn evaluate_outcome(formula: &str, values: &HashMap<FieldId, Option<f64>>) -> FormulaOutcome {
    // Referência nula ganha de qualquer outra coisa, inclusive de erro de sintaxe
    let mut resolved = HashMap::new();
    for id in references(formula) {
        match values.get(&id).copied().flatten() {
            Some(v) => {
                resolved.insert(id, v);
            }
            None => return FormulaOutcome::Incomplete,
        }
    }

    let Some(rpn) = tokenize(formula).and_then(to_rpn) else {
        return FormulaOutcome::Malformed;
    };

    eval_rpn(&rpn, &resolved)
}

pub fn evaluate(formula: &str, values: &HashMap<FieldId, Option<f64>>) -> Evaluation {
    let outcome = evaluate_outcome(formula, values);
    if outcome == FormulaOutcome::Malformed {
        tracing::warn!(formula, "Fórmula malformada; campo de cálculo fica nulo");
    }
    outcome.into()
}

/// Validação feita na hora de salvar a definição do campo (não na avaliação).
pub fn validate_syntax(formula: &str) -> Result<(), FieldValueError> {
    let substituted = substitute_placeholders(formula, "1");

    let allowed = |c: char| c.is_ascii_digit() || "+-*/().".contains(c) || c.is_whitespace();
    if substituted.trim().is_empty() || !substituted.chars().all(allowed) {
        return Err(FieldValueError::InvalidFormulaSyntax);
    }

    // A estrutura é checada na fórmula original: substituir colaria tokens
    // vizinhos ("{{1}}{{2}}" viraria "11"). Divisão por zero aqui é aceitável.
    let dummy: HashMap<FieldId, Option<f64>> = references(formula).into_iter().map(|id| (id, Some(1.0))).collect();
    match evaluate_outcome(formula, &dummy) {
        FormulaOutcome::Malformed => Err(FieldValueError::MalformedFormula),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(FieldId, Option<f64>)]) -> HashMap<FieldId, Option<f64>> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn adds_two_fields() {
        let result = evaluate("{{1}} + {{2}}", &values(&[(1, Some(10.0)), (2, Some(5.0))]));
        assert_eq!(result, Evaluation { value: Some(15.0), warnings: vec![] });
    }

    #[test]
    fn division_by_zero_yields_null_and_one_warning() {
        let result = evaluate("{{1}} / {{2}}", &values(&[(1, Some(10.0)), (2, Some(0.0))]));
        assert_eq!(result.value, None);
        assert_eq!(result.warnings, vec![DIVISION_BY_ZERO_WARNING.to_string()]);
    }

    #[test]
    fn null_reference_is_not_yet_computable() {
        let result = evaluate("{{1}} * 2", &values(&[(1, None)]));
        assert_eq!(result, Evaluation { value: None, warnings: vec![] });
    }

    #[test]
    fn absent_reference_is_not_yet_computable() {
        let result = evaluate("{{1}} + {{9}}", &values(&[(1, Some(3.0))]));
        assert_eq!(result.value, None);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn null_reference_wins_over_division_by_zero() {
        let outcome = evaluate_outcome("{{1}} / 0 + {{2}}", &values(&[(1, Some(1.0)), (2, None)]));
        assert_eq!(outcome, FormulaOutcome::Incomplete);
    }

    #[test]
    fn respects_operator_precedence() {
        let v = values(&[(1, Some(2.0)), (2, Some(3.0)), (3, Some(4.0))]);
        assert_eq!(evaluate("{{1}} + {{2}} * {{3}}", &v).value, Some(14.0));
        assert_eq!(evaluate("({{1}} + {{2}}) * {{3}}", &v).value, Some(20.0));
        assert_eq!(evaluate("{{3}} - {{2}} - {{1}}", &v).value, Some(-1.0));
        assert_eq!(evaluate("{{3}} / {{1}} / {{1}}", &v).value, Some(1.0));
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiplication() {
        let v = values(&[(1, Some(5.0))]);
        assert_eq!(evaluate("-{{1}} * 2", &v).value, Some(-10.0));
        assert_eq!(evaluate("2 * -{{1}}", &v).value, Some(-10.0));
        assert_eq!(evaluate("-(2 - 7)", &v).value, Some(5.0));
        assert_eq!(evaluate("3 - -2", &v).value, Some(5.0));
        assert_eq!(evaluate("--4", &v).value, Some(4.0));
    }

    #[test]
    fn decimal_literals_use_ieee_doubles() {
        let result = evaluate("0.1 + 0.2", &HashMap::new());
        assert_eq!(result.value, Some(0.1 + 0.2));
        assert_eq!(evaluate(".5 * 4", &HashMap::new()).value, Some(2.0));
    }

    #[test]
    fn malformed_expressions_are_silent_nulls() {
        let v = values(&[(1, Some(1.0))]);
        for formula in ["{{1}} +", "({{1}} + 2", "{{1}} + 2)", "1.2.3", "{{1}} 2", "{{1}} & 2", "()"] {
            assert_eq!(evaluate_outcome(formula, &v), FormulaOutcome::Malformed, "{formula}");
            assert_eq!(evaluate(formula, &v), Evaluation { value: None, warnings: vec![] });
        }
    }

    #[test]
    fn overflow_is_stored_as_null() {
        let outcome = evaluate_outcome("{{1}} * {{1}}", &values(&[(1, Some(1e200))]));
        assert_eq!(outcome, FormulaOutcome::NonFinite);
        assert_eq!(Evaluation::from(outcome).value, None);
    }

    #[test]
    fn extracts_unique_references_in_order() {
        assert_eq!(references("{{4}} + {{2}} * {{4}} - {{10}}"), vec![4, 2, 10]);
        assert!(references("1 + 2").is_empty());
        assert!(references("{{x}} + {{}}").is_empty());
    }

    #[test]
    fn validate_syntax_accepts_arithmetic_with_placeholders() {
        assert!(validate_syntax("{{1}} + {{2}}").is_ok());
        assert!(validate_syntax("({{1}} - 3.5) / {{2}}").is_ok());
        // Com os valores fictícios isso divide por zero, mas a sintaxe é válida
        assert!(validate_syntax("{{1}} / ({{2}} - 1)").is_ok());
    }

    #[test]
    fn validate_syntax_rejects_foreign_characters() {
        assert_eq!(validate_syntax("{{1}} % 2"), Err(FieldValueError::InvalidFormulaSyntax));
        assert_eq!(validate_syntax("sqrt({{1}})"), Err(FieldValueError::InvalidFormulaSyntax));
        assert_eq!(validate_syntax("{{a}} + 1"), Err(FieldValueError::InvalidFormulaSyntax));
        assert_eq!(validate_syntax("   "), Err(FieldValueError::InvalidFormulaSyntax));
    }

    #[test]
    fn validate_syntax_rejects_broken_structure() {
        assert_eq!(validate_syntax("({{1}} + 2"), Err(FieldValueError::MalformedFormula));
        assert_eq!(validate_syntax("{{1}} * * 2"), Err(FieldValueError::MalformedFormula));
        // Operandos colados, sem operador entre eles
        for formula in ["{{1}}{{2}}", "{{1}}2", "{{1}}.5"] {
            assert_eq!(validate_syntax(formula), Err(FieldValueError::MalformedFormula), "{formula}");
        }
    }
}
