// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Infix to postfix conversion with the shunting-yard algorithm.
//!
//! Operands are single letters or digits. `^` binds tightest and is right
//! associative; `* /` come next and `+ -` last, both left associative.

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

/// Longest expression accepted, whitespace excluded.
pub const MAX_EXPRESSION: usize = 50;

const COUNTERS: &[&str] = &["tokens", "pushes", "pops"];

fn is_operator(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '^')
}

fn is_operand(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Binding strength of `op`; 0 for anything that is not an operator.
pub fn precedence(op: char) -> u8 {
    match op {
        '+' | '-' => 1,
        '*' | '/' => 2,
        '^' => 3,
        _ => 0,
    }
}

fn right_associative(op: char) -> bool {
    op == '^'
}

/// Checks an expression and returns its tokens.
///
/// # Errors
/// [`InputError::Invalid`] naming the first problem found.
pub fn tokenize(expression: &str) -> Result<Vec<char>, InputError> {
    let tokens: Vec<char> = expression.chars().filter(|c| !c.is_whitespace()).collect();
    if tokens.is_empty() {
        return Err(InputError::Invalid("Expression cannot be empty".to_owned()));
    }
    InputError::check_len("expression", tokens.len(), MAX_EXPRESSION)?;
    if let Some(&bad) = tokens
        .iter()
        .find(|&&c| !(is_operand(c) || is_operator(c) || c == '(' || c == ')'))
    {
        return Err(InputError::Invalid(format!("Invalid character: {bad}")));
    }
    let mut depth = 0_usize;
    for &c in &tokens {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => {
                return Err(InputError::Invalid("Mismatched closing parenthesis".to_owned()))
            }
            ')' => depth -= 1,
            _ => {}
        }
    }
    if depth != 0 {
        return Err(InputError::Invalid("Mismatched parentheses".to_owned()));
    }
    // An operand or `)` must be followed by an operator or `)`; anything
    // else must be followed by an operand or `(`.
    let mut want_operand = true;
    for (i, &c) in tokens.iter().enumerate() {
        let fits = if want_operand {
            is_operand(c) || c == '('
        } else {
            is_operator(c) || c == ')'
        };
        if !fits {
            let reason = match (want_operand, i) {
                (true, 0) => "Expression cannot start with an operator".to_owned(),
                (true, _) if is_operator(c) && is_operator(tokens[i - 1]) => {
                    "Consecutive operators are not allowed".to_owned()
                }
                (true, _) => format!("Missing operand before '{c}' at position {i}"),
                (false, _) => format!("Missing operator before '{c}' at position {i}"),
            };
            return Err(InputError::Invalid(reason));
        }
        want_operand = is_operator(c) || c == '(';
    }
    if want_operand {
        return Err(InputError::Invalid(
            "Expression cannot end with an operator".to_owned(),
        ));
    }
    Ok(tokens)
}

/// What a conversion snapshot shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfixStep {
    /// Tokenized input.
    #[default]
    Init,
    /// Operand copied to the output.
    Operand,
    /// Token pushed on the stack.
    Push,
    /// Operator moved from the stack to the output.
    Pop,
    /// `)` reached; unwinding to its `(`.
    Close,
    /// `(` discarded.
    Discard,
    /// Output complete.
    Done,
}

/// Snapshot payload for infix conversion traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfixState {
    /// Input tokens.
    pub tokens: Vec<char>,
    /// Token being processed.
    pub cursor: Option<usize>,
    /// Operator stack, bottom first.
    pub stack: Vec<char>,
    /// Postfix output so far.
    pub output: Vec<char>,
    /// Kind of step.
    pub step: InfixStep,
}

impl InfixState {
    /// Output tokens joined by spaces.
    pub fn postfix(&self) -> String {
        self.output
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Converts an infix expression to postfix.
#[derive(Clone, Copy, Debug, Default)]
pub struct InfixToPostfixExecutor;

impl Executor for InfixToPostfixExecutor {
    type Input = String;
    type State = InfixState;

    fn name(&self) -> &'static str {
        "infix-to-postfix"
    }

    fn run(&self, input: &String) -> Trace<InfixState> {
        let tokens = match tokenize(input) {
            Ok(tokens) => tokens,
            Err(e) => return reject(&e, InfixState::default()),
        };
        let state = InfixState {
            tokens: tokens.clone(),
            ..InfixState::default()
        };
        let rec = TraceRecorder::with_counters(
            format!("Converting {} to postfix", input.trim()),
            state.clone(),
            COUNTERS,
        );
        let mut run = Shunt { state, rec };
        for (i, &c) in tokens.iter().enumerate() {
            run.state.cursor = Some(i);
            run.rec.count("tokens");
            run.token(c);
        }
        run.state.cursor = None;
        while let Some(op) = run.state.stack.pop() {
            run.state.output.push(op);
            run.rec.count("pops");
            run.snap(
                format!("Pop remaining operator '{op}' from stack to output"),
                InfixStep::Pop,
            );
        }
        let postfix = run.state.postfix();
        run.snap(format!("Conversion completed: {postfix}"), InfixStep::Done);
        run.rec.finish()
    }
}

struct Shunt {
    state: InfixState,
    rec: TraceRecorder<InfixState>,
}

impl Shunt {
    fn snap(&mut self, description: String, step: InfixStep) {
        self.state.step = step;
        self.rec.record(description, self.state.clone());
    }

    fn token(&mut self, c: char) {
        if is_operand(c) {
            self.state.output.push(c);
            self.snap(format!("Add operand '{c}' to output"), InfixStep::Operand);
        } else if c == '(' {
            self.state.stack.push(c);
            self.rec.count("pushes");
            self.snap("Push opening parenthesis '(' to stack".to_owned(), InfixStep::Push);
        } else if c == ')' {
            self.snap("Encountered closing parenthesis ')'".to_owned(), InfixStep::Close);
            while let Some(top) = self.state.stack.pop() {
                self.rec.count("pops");
                if top == '(' {
                    self.snap(
                        "Remove matching opening parenthesis '(' from stack".to_owned(),
                        InfixStep::Discard,
                    );
                    break;
                }
                self.state.output.push(top);
                self.snap(format!("Pop operator '{top}' from stack to output"), InfixStep::Pop);
            }
        } else {
            self.operator(c);
        }
    }

    fn operator(&mut self, c: char) {
        while let Some(&top) = self.state.stack.last() {
            if top == '(' {
                break;
            }
            let why = if precedence(top) > precedence(c) {
                "higher precedence"
            } else if precedence(top) == precedence(c) && !right_associative(c) {
                "equal precedence, left associative"
            } else {
                break;
            };
            self.state.stack.pop();
            self.state.output.push(top);
            self.rec.count("pops");
            self.snap(
                format!("Pop operator '{top}' ({why}) from stack to output"),
                InfixStep::Pop,
            );
        }
        self.state.stack.push(c);
        self.rec.count("pushes");
        self.snap(format!("Push operator '{c}' to stack"), InfixStep::Push);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn postfix(expr: &str) -> String {
        InfixToPostfixExecutor
            .run(&expr.to_owned())
            .final_state()
            .postfix()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(postfix("A+B*C"), "A B C * +");
        assert_eq!(postfix("A-B-C"), "A B - C -");
        assert_eq!(postfix("A^B^C"), "A B C ^ ^");
        assert_eq!(postfix("(A+B)*(C-D)"), "A B + C D - *");
        assert_eq!(postfix("a + b * (c ^ d - e) ^ (f + g * h) - i"), "a b c d ^ e - f g h * + ^ * + i -");
    }

    #[test]
    fn trace_narrates_each_token() {
        let t = InfixToPostfixExecutor.run(&"A+B*C".to_owned());
        let descriptions: Vec<&str> = t.descriptions().collect();
        assert_eq!(
            &descriptions[1..],
            &[
                "Add operand 'A' to output",
                "Push operator '+' to stack",
                "Add operand 'B' to output",
                "Push operator '*' to stack",
                "Add operand 'C' to output",
                "Pop remaining operator '*' from stack to output",
                "Pop remaining operator '+' from stack to output",
                "Conversion completed: A B C * +",
            ]
        );
        assert_eq!(t.last().metrics.get("tokens"), 5);
        assert_eq!(t.last().metrics.get("pushes"), 2);
        assert_eq!(t.last().metrics.get("pops"), 2);
    }

    #[test]
    fn invalid_expressions_are_rejected() {
        for (expr, reason) in [
            ("", "Expression cannot be empty"),
            ("A+%", "Invalid character: %"),
            ("A+B)", "Mismatched closing parenthesis"),
            ("(A+B", "Mismatched parentheses"),
            ("A+*B", "Consecutive operators are not allowed"),
            ("*A", "Expression cannot start with an operator"),
            ("A+", "Expression cannot end with an operator"),
            ("AB", "Missing operator before 'B' at position 1"),
            ("()", "Missing operand before ')' at position 1"),
        ] {
            let t = InfixToPostfixExecutor.run(&expr.to_owned());
            assert_eq!(t.len(), 1, "{expr}");
            assert_eq!(t[0].description, reason, "{expr}");
        }
    }
}
