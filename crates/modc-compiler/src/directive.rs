//! Build directives.
//!
//! In-body statements that mutate build metadata instead of emitting a
//! declaration:
//!
//! - `build depends      "<filename>";` adds a native file dependency
//! - `build set          <name> "<value>";` sets a build variable (`:=`)
//! - `build set default  <name> "<value>";` sets a default value (`?=`)
//! - `build append       <name> "<value>";` appends to a variable (`+=`)

use modc_lexer::TokenKind;

use crate::error::Result;
use crate::grammar::Parser;
use crate::import;
use crate::package::{BuildVar, VarOp};

const BUILD_SYNTAX: &str = "Invalid build syntax";

/// Parse one `build` statement; the `build` keyword has been consumed.
pub(crate) fn parse(p: &mut Parser) -> Result<()> {
    let item = p.next_significant(BUILD_SYNTAX, "a build directive")?;
    match (item.kind, item.text.as_str()) {
        (TokenKind::Identifier, "depends") => parse_depends(p),
        (TokenKind::Identifier, "set") => parse_set(p),
        (TokenKind::Identifier, "append") => parse_append(p),
        _ => Err(p.error_at(
            BUILD_SYNTAX,
            &item,
            format!(
                "Expecting one of 'depends', 'set', 'set default' or 'append', but got '{}'",
                item.text
            ),
        )),
    }
}

fn parse_depends(p: &mut Parser) -> Result<()> {
    let filename = p.expect_quoted(BUILD_SYNTAX, "a filename")?;
    p.expect_semicolon(BUILD_SYNTAX)?;

    let value = modc_lexer::unquote(&filename.text);
    import::add_native_dependency(&p.package(), &value).map_err(|e| {
        p.error_at(
            BUILD_SYNTAX,
            &filename,
            format!("Error adding dependency: {e}"),
        )
    })?;
    Ok(())
}

fn parse_set(p: &mut Parser) -> Result<()> {
    let mut name = p.expect_identifier(BUILD_SYNTAX, "a variable name")?;
    let op = if name.text == "default" {
        name = p.expect_identifier(BUILD_SYNTAX, "a variable name")?;
        VarOp::SetDefault
    } else {
        VarOp::Set
    };
    parse_value(p, name.text, op)
}

fn parse_append(p: &mut Parser) -> Result<()> {
    let name = p.expect_identifier(BUILD_SYNTAX, "a variable name")?;
    parse_value(p, name.text, VarOp::Append)
}

fn parse_value(p: &mut Parser, name: String, op: VarOp) -> Result<()> {
    let value = p.expect_quoted(BUILD_SYNTAX, "a quoted string")?;
    p.expect_semicolon(BUILD_SYNTAX)?;

    p.package().borrow_mut().push_variable(BuildVar {
        name,
        value: modc_lexer::unquote(&value.text),
        op,
    });
    Ok(())
}
