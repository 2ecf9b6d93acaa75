use crate::error::{MergeError, Result};
use crate::grammar::{split_keyword, tokenize, Line};

/// Right-hand side of a keyword statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
}

impl Value {
    fn parse(rest: &str) -> Self {
        if rest.contains(',') {
            Value::List(rest.split(',').map(|s| s.trim().to_string()).collect())
        } else {
            Value::Scalar(rest.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionStatement {
    pub keyword: String,
    pub value: Value,
    /// Rest of the line as written, commas included.
    pub raw: String,
    pub line: usize,
}

impl OptionStatement {
    fn new(keyword: &str, rest: &str, line: usize) -> Self {
        Self {
            keyword: keyword.to_string(),
            value: Value::parse(rest),
            raw: rest.to_string(),
            line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub pattern: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalStatement {
    pub conditions: Vec<Condition>,
    pub body: Vec<OptionStatement>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Keyword(OptionStatement),
    If(ConditionalStatement),
}

enum State {
    TopLevel,
    Conditions(ConditionalStatement),
    Body(ConditionalStatement),
}

fn syntax_error(line: &Line<'_>, column: usize, message: &str) -> MergeError {
    MergeError::Syntax {
        line: line.number,
        column,
        text: line.raw.to_string(),
        message: message.to_string(),
    }
}

fn split<'a>(line: &Line<'a>) -> Result<(&'a str, &'a str)> {
    split_keyword(line.content)
        .map_err(|offset| syntax_error(line, line.column + offset, "expected a keyword"))
}

fn keyword_statement(line: &Line<'_>) -> Result<OptionStatement> {
    let (keyword, rest) = split(line)?;
    Ok(OptionStatement::new(keyword, rest, line.number))
}

fn push_condition(block: &mut ConditionalStatement, pattern: &str, line: usize) {
    if !pattern.is_empty() {
        block.conditions.push(Condition {
            pattern: pattern.to_string(),
            line,
        });
    }
}

/// Handles a non-indented line while no block is open.
fn start_statement(line: &Line<'_>, statements: &mut Vec<Statement>) -> Result<State> {
    let (keyword, rest) = split(line)?;
    if keyword == "if" {
        let mut block = ConditionalStatement {
            conditions: Vec::new(),
            body: Vec::new(),
            line: line.number,
        };
        push_condition(&mut block, rest, line.number);
        return Ok(State::Conditions(block));
    }
    statements.push(Statement::Keyword(OptionStatement::new(
        keyword,
        rest,
        line.number,
    )));
    Ok(State::TopLevel)
}

/// Parses rules text into top-level statements.
///
/// `if` opens a block whose conditions are the rest of the `if` line plus
/// every following non-indented line; the first indented line starts the
/// body, and the next non-indented line after it closes the block.
pub fn parse(text: &str) -> Result<Vec<Statement>> {
    let mut statements = Vec::new();
    let mut state = State::TopLevel;
    let mut last = None;

    for line in tokenize(text) {
        state = match (state, line.indented) {
            (State::TopLevel, false) => start_statement(&line, &mut statements)?,
            (State::TopLevel, true) => {
                return Err(syntax_error(
                    &line,
                    line.column,
                    "indented line outside of an if block",
                ))
            }
            (State::Conditions(mut block), false) => {
                push_condition(&mut block, line.content, line.number);
                State::Conditions(block)
            }
            (State::Conditions(mut block), true) | (State::Body(mut block), true) => {
                block.body.push(keyword_statement(&line)?);
                State::Body(block)
            }
            (State::Body(block), false) => {
                statements.push(Statement::If(block));
                start_statement(&line, &mut statements)?
            }
        };
        last = Some(line);
    }

    match state {
        State::TopLevel => {}
        State::Body(block) => statements.push(Statement::If(block)),
        State::Conditions(_) => {
            if let Some(line) = last {
                return Err(syntax_error(
                    &line,
                    line.raw.chars().count() + 1,
                    "expected an indented body after if conditions",
                ));
            }
        }
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(s: &str) -> Value {
        Value::Scalar(s.to_string())
    }

    fn keyword(stmt: &Statement) -> &OptionStatement {
        match stmt {
            Statement::Keyword(s) => s,
            Statement::If(_) => panic!("expected keyword statement, got {stmt:?}"),
        }
    }

    fn block(stmt: &Statement) -> &ConditionalStatement {
        match stmt {
            Statement::If(b) => b,
            Statement::Keyword(_) => panic!("expected if block, got {stmt:?}"),
        }
    }

    fn patterns(b: &ConditionalStatement) -> Vec<&str> {
        b.conditions.iter().map(|c| c.pattern.as_str()).collect()
    }

    #[test]
    fn test_keyword_statements() {
        let stmts = parse("skip 2\ncurrency   £  \nfields date, description ,amount\n").unwrap();
        assert_eq!(stmts.len(), 3);
        assert_eq!(keyword(&stmts[0]).keyword, "skip");
        assert_eq!(keyword(&stmts[0]).value, scalar("2"));
        assert_eq!(keyword(&stmts[1]).value, scalar("£"));
        assert_eq!(
            keyword(&stmts[2]).value,
            Value::List(vec!["date".into(), "description".into(), "amount".into()])
        );
    }

    #[test]
    fn test_raw_text_keeps_commas() {
        let stmts = parse("if SALARY\n  description Salary,  ACME Ltd \n").unwrap();
        let body = &block(&stmts[0]).body[0];
        assert_eq!(body.raw, "Salary,  ACME Ltd");
        assert_eq!(
            body.value,
            Value::List(vec!["Salary".into(), "ACME Ltd".into()])
        );
    }

    #[test]
    fn test_if_block_with_condition_list() {
        let stmts = parse("if\nLINK\nATM\n  account2 assets:cash\n").unwrap();
        assert_eq!(stmts.len(), 1);
        let b = block(&stmts[0]);
        assert_eq!(patterns(b), vec!["LINK", "ATM"]);
        assert_eq!(b.conditions[1].line, 3);
        assert_eq!(b.body.len(), 1);
        assert_eq!(b.body[0].keyword, "account2");
        assert_eq!(b.body[0].value, scalar("assets:cash"));
    }

    #[test]
    fn test_condition_on_if_line() {
        let stmts = parse("if [0-9]{6}\n  description ({description})\n").unwrap();
        let b = block(&stmts[0]);
        assert_eq!(patterns(b), vec!["[0-9]{6}"]);
        assert_eq!(b.body[0].value, scalar("({description})"));
    }

    #[test]
    fn test_conditions_are_not_parsed_as_keywords() {
        let stmts = parse("if ^Tesco\n*STARBUCKS ^[a-z]+$\n\taccount2 expenses:food\n").unwrap();
        assert_eq!(patterns(block(&stmts[0])), vec!["^Tesco", "*STARBUCKS ^[a-z]+$"]);
    }

    #[test]
    fn test_block_ends_at_next_non_indented_line() {
        let text = "\
if ATM
  account2 assets:cash
  comment withdrawal

account1 assets:bank
if SALARY
    account2 income:salary
";
        let stmts = parse(text).unwrap();
        assert_eq!(stmts.len(), 3);
        assert_eq!(block(&stmts[0]).body.len(), 2);
        assert_eq!(keyword(&stmts[1]).keyword, "account1");
        assert_eq!(patterns(block(&stmts[2])), vec!["SALARY"]);
    }

    #[test]
    fn test_blank_lines_and_comments_do_not_split_blocks() {
        let text = "if\nLINK\n\n# cash machines\nATM\n  account2 assets:cash\n\n  # note\n  comment cash\n";
        let stmts = parse(text).unwrap();
        assert_eq!(stmts.len(), 1);
        let b = block(&stmts[0]);
        assert_eq!(patterns(b), vec!["LINK", "ATM"]);
        assert_eq!(b.body.len(), 2);
    }

    #[test]
    fn test_indented_line_at_top_level_is_an_error() {
        let err = parse("skip 1\n  account2 assets:cash\n").unwrap_err();
        match err {
            MergeError::Syntax { line, column, text, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, 3);
                assert_eq!(text, "  account2 assets:cash");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_keyword_top_level_line_is_an_error() {
        let err = parse("skip 1\n[0-9]+ whatever\n").unwrap_err();
        assert!(matches!(err, MergeError::Syntax { line: 2, column: 1, .. }));
    }

    #[test]
    fn test_bad_body_line_is_an_error() {
        let err = parse("if ATM\n    account2: assets:cash\n").unwrap_err();
        assert!(matches!(err, MergeError::Syntax { line: 2, column: 13, .. }));
    }

    #[test]
    fn test_if_without_body_is_an_error() {
        let err = parse("if ATM\nLINK\n").unwrap_err();
        assert!(matches!(err, MergeError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_syntax_error_message_points_at_column() {
        let err = parse("  account2 x\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Syntax error at line 1, column 3: indented line outside of an if block\n  account2 x\n  ^"
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# only a comment\n\n").unwrap().is_empty());
    }
}
