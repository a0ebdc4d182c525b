//! Statement dispatcher for module bodies.
//!
//! A module body is C text with four dialect statements layered on top:
//! `package`, `import`, `export`, and `build`. Dialect statements are only
//! recognized at brace depth zero at the start of a statement; everything
//! else is passed through into the generated source verbatim, with two
//! rewrites applied on the way:
//!
//! - `Alias.member`, where `Alias` is a registered import, becomes the
//!   dependency's backend symbol for that export (`global.member` becomes
//!   plain `member`),
//! - a bare identifier matching one of this module's exported local names
//!   becomes its backend symbol.

use std::path::PathBuf;

use modc_lexer::{Location, Token, TokenKind};

use crate::directive;
use crate::error::{CompileError, Result};
use crate::export::{self, ExportKind};
use crate::import;
use crate::package::PackageRef;
use crate::registry::Registry;

pub(crate) const SYNTAX: &str = "Invalid syntax";
pub(crate) const PACKAGE_SYNTAX: &str = "Invalid package syntax";
pub(crate) const IMPORT_SYNTAX: &str = "Invalid import syntax";
pub(crate) const EXPORT_SYNTAX: &str = "Invalid export syntax";

/// Parse a module body, using `pkg` as the sink for everything declared in
/// it. Imports encountered along the way re-enter the registry.
pub(crate) fn parse(source: &str, registry: &Registry, pkg: &PackageRef) -> Result<()> {
    let file = pkg.borrow().source_rel.clone();
    let tokens = modc_lexer::lex(source).map_err(|e| CompileError::Lex {
        file: file.clone(),
        source: e,
    })?;
    Parser {
        source,
        file,
        tokens,
        pos: 0,
        depth: 0,
        stmt_start: true,
        registry,
        pkg: pkg.clone(),
    }
    .run()
}

pub(crate) struct Parser<'a> {
    source: &'a str,
    file: PathBuf,
    tokens: Vec<Token>,
    pos: usize,
    /// Brace depth of the passthrough stream.
    depth: i32,
    /// True at positions where a dialect statement may begin.
    stmt_start: bool,
    registry: &'a Registry,
    pkg: PackageRef,
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> Result<()> {
        while self.pos < self.tokens.len() {
            let tok = self.tokens[self.pos].clone();
            if self.depth == 0 && self.stmt_start && tok.kind == TokenKind::Identifier {
                let handled = match tok.text.as_str() {
                    "package" => {
                        self.pos += 1;
                        self.parse_package()?;
                        true
                    }
                    "import" => {
                        self.pos += 1;
                        self.parse_import()?;
                        true
                    }
                    "export" => {
                        self.pos += 1;
                        self.parse_export()?;
                        true
                    }
                    "build" => {
                        self.pos += 1;
                        directive::parse(self)?;
                        true
                    }
                    _ => false,
                };
                if handled {
                    self.stmt_start = true;
                    continue;
                }
            }
            self.passthrough()?;
        }
        Ok(())
    }

    /// Copy one token (or one rewritten member access) into the generated
    /// source.
    fn passthrough(&mut self) -> Result<()> {
        if let Some((text, _)) = self.member_at(self.pos)? {
            self.pos += 3;
            self.stmt_start = false;
            return self.emit(&text);
        }

        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        match tok.kind {
            TokenKind::Identifier => {
                self.stmt_start = false;
                match self.local_symbol(&tok.text) {
                    Some(symbol) => self.emit(&symbol),
                    None => self.emit(&tok.text),
                }
            }
            TokenKind::Symbol => {
                match tok.text.as_str() {
                    "{" => {
                        self.depth += 1;
                        self.stmt_start = false;
                    }
                    "}" => {
                        self.depth -= 1;
                        self.stmt_start = self.depth == 0;
                    }
                    ";" => self.stmt_start = self.depth == 0,
                    _ => self.stmt_start = false,
                }
                self.emit(&tok.text)
            }
            TokenKind::Whitespace
            | TokenKind::LineComment
            | TokenKind::BlockComment
            | TokenKind::Preprocessor => self.emit(&tok.text),
            _ => {
                self.stmt_start = false;
                self.emit(&tok.text)
            }
        }
    }

    /// `package "<name>";` overrides the module's derived name.
    fn parse_package(&mut self) -> Result<()> {
        let name = self.expect_quoted(PACKAGE_SYNTAX, "a package name")?;
        self.expect_semicolon(PACKAGE_SYNTAX)?;
        let value = modc_lexer::unquote(&name.text);
        self.pkg.borrow_mut().set_name(&value);
        Ok(())
    }

    /// `import <Alias> from "<file>";`
    fn parse_import(&mut self) -> Result<()> {
        let alias = self.expect_identifier(IMPORT_SYNTAX, "an identifier")?;
        let from = self.expect_identifier(IMPORT_SYNTAX, "'from'")?;
        if from.text != "from" {
            return Err(self.error_at(
                IMPORT_SYNTAX,
                &from,
                format!("Expecting 'from', but got '{}'", from.text),
            ));
        }
        let filename = self.expect_quoted(IMPORT_SYNTAX, "a filename")?;
        self.expect_semicolon(IMPORT_SYNTAX)?;

        let filename = modc_lexer::unquote(&filename.text);
        import::add_import(&alias.text, &filename, &self.pkg, self.registry)?;
        Ok(())
    }

    /// `export <declaration> [as <alias>];`
    ///
    /// The declaration is parsed just enough to classify its kind and find
    /// the declared name; the name is renamed to the backend symbol
    /// `<module>_<name>` in both the generated source and the header text.
    fn parse_export(&mut self) -> Result<()> {
        let (mut toks, semi) = self.collect_declaration()?;

        let mut alias: Option<String> = None;
        if semi {
            if let Some((at, name)) = trailing_alias(&toks) {
                alias = Some(name);
                toks.truncate(at);
            }
        }
        while toks.last().map(|t| t.is_trivia()).unwrap_or(false) {
            toks.pop();
        }
        if toks.is_empty() {
            return Err(self.error_here(EXPORT_SYNTAX, "Expecting a declaration after 'export'"));
        }

        let (kind, local) = self.classify(&toks)?;
        let module = self.pkg.borrow().name.clone();
        let symbol = format!("{module}_{local}");

        let (source_text, header_decl) =
            self.render_declaration(&toks, &local, &symbol, kind)?;

        export::add_export(&local, alias.as_deref(), &symbol, kind, &header_decl, &self.pkg);
        self.emit(&source_text)
    }

    /// Collect the tokens of one export declaration.
    ///
    /// Returns `(tokens, true)` for declarations terminated by a `;` at
    /// depth zero, and `(tokens, false)` for function definitions ending at
    /// their closing body brace.
    fn collect_declaration(&mut self) -> Result<(Vec<Token>, bool)> {
        let mut toks: Vec<Token> = Vec::new();
        let mut depth = 0i32;
        let mut saw_paren = false;
        let mut saw_brace = false;

        loop {
            if self.pos >= self.tokens.len() {
                return Err(
                    self.error_here(EXPORT_SYNTAX, "Expecting ';' to end the export declaration")
                );
            }
            let tok = self.tokens[self.pos].clone();
            self.pos += 1;

            if toks.is_empty() && tok.is_trivia() {
                continue;
            }
            if tok.is_symbol(';') && depth == 0 {
                return Ok((toks, true));
            }
            if tok.is_symbol('(') && depth == 0 && !saw_brace {
                saw_paren = true;
            }
            if tok.is_symbol('{') {
                depth += 1;
                saw_brace = true;
            }
            let closes = tok.is_symbol('}');
            toks.push(tok);

            if closes {
                depth -= 1;
                // A function body ends the declaration at its closing
                // brace, unless an alias or stray `;` follows. Type bodies
                // run on to the terminating `;`.
                if depth == 0 && saw_paren {
                    let continues = self
                        .peek_significant()
                        .map(|t| {
                            t.is_symbol(';') || (t.kind == TokenKind::Identifier && t.text == "as")
                        })
                        .unwrap_or(false);
                    if !continues {
                        return Ok((toks, false));
                    }
                }
            }
        }
    }

    /// Determine the export kind and local name of a collected declaration.
    fn classify(&self, toks: &[Token]) -> Result<(ExportKind, String)> {
        let sig: Vec<usize> = toks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_trivia())
            .map(|(i, _)| i)
            .collect();
        let first = &toks[sig[0]];

        if first.kind == TokenKind::Identifier && first.text == "typedef" {
            return match sig
                .iter()
                .rev()
                .map(|&i| &toks[i])
                .find(|t| t.kind == TokenKind::Identifier)
            {
                Some(name) => Ok((ExportKind::Type, name.text.clone())),
                None => Err(self.error_at(
                    EXPORT_SYNTAX,
                    first,
                    "Expecting a name for the exported typedef".to_string(),
                )),
            };
        }

        if first.kind == TokenKind::Identifier
            && matches!(first.text.as_str(), "enum" | "union" | "struct")
            && sig.len() >= 3
            && toks[sig[1]].kind == TokenKind::Identifier
            && toks[sig[2]].is_symbol('{')
        {
            let kind = match first.text.as_str() {
                "enum" => ExportKind::Enum,
                "union" => ExportKind::Union,
                _ => ExportKind::Struct,
            };
            return Ok((kind, toks[sig[1]].text.clone()));
        }

        // Function: the identifier immediately before the first top-level
        // parenthesis names the declarator.
        let mut depth = 0i32;
        let mut prev_ident: Option<String> = None;
        for &i in &sig {
            let t = &toks[i];
            if t.is_symbol('{') {
                depth += 1;
            } else if t.is_symbol('}') {
                depth -= 1;
            } else if depth == 0 && t.is_symbol('(') {
                if let Some(name) = prev_ident {
                    return Ok((ExportKind::Function, name));
                }
                break;
            } else if t.kind == TokenKind::Identifier {
                prev_ident = Some(t.text.clone());
            }
        }

        // Scalar declaration: the last identifier is the declared name.
        match sig
            .iter()
            .rev()
            .map(|&i| &toks[i])
            .find(|t| t.kind == TokenKind::Identifier)
        {
            Some(name) => Ok((ExportKind::Block, name.text.clone())),
            None => Err(self.error_at(
                EXPORT_SYNTAX,
                first,
                "Expecting a name in the exported declaration".to_string(),
            )),
        }
    }

    /// Render a collected declaration with all rewrites applied.
    ///
    /// Returns the text for the generated source and the declaration text
    /// for the header (the signature for function definitions).
    fn render_declaration(
        &mut self,
        toks: &[Token],
        local: &str,
        symbol: &str,
        kind: ExportKind,
    ) -> Result<(String, String)> {
        let mut out = String::new();
        let mut body_at: Option<usize> = None;
        let mut depth = 0i32;
        let mut i = 0;

        while i < toks.len() {
            if let Some((text, dep)) = self.member_in(toks, i)? {
                // An export whose declaration mentions a dependency's
                // symbol needs that dependency's header in its own header.
                if let Some(dep) = dep {
                    export::include_dependency(&self.pkg, &dep)?;
                }
                out.push_str(&text);
                i += 3;
                continue;
            }

            let t = &toks[i];
            i += 1;
            match t.kind {
                TokenKind::Identifier if t.text == local => out.push_str(symbol),
                TokenKind::Identifier => match self.local_symbol(&t.text) {
                    Some(s) => out.push_str(&s),
                    None => out.push_str(&t.text),
                },
                _ => {
                    if t.is_symbol('{') {
                        if depth == 0 && body_at.is_none() {
                            body_at = Some(out.len());
                        }
                        depth += 1;
                    } else if t.is_symbol('}') {
                        depth -= 1;
                    }
                    out.push_str(&t.text);
                }
            }
        }

        if kind == ExportKind::Function {
            if let Some(at) = body_at {
                let signature = format!("{};", out[..at].trim_end());
                return Ok((out.trim_end().to_string(), signature));
            }
        }
        let text = format!("{};", out.trim_end());
        Ok((text.clone(), text))
    }

    /// Resolve `Alias.member` starting at token `i` of `toks`.
    ///
    /// `Ok(None)` means this is not a rewritable member access (ordinary C
    /// passes through); an import alias with an unknown member is an error.
    fn member_in(
        &self,
        toks: &[Token],
        i: usize,
    ) -> Result<Option<(String, Option<PackageRef>)>> {
        let (Some(head), Some(dot), Some(member)) = (toks.get(i), toks.get(i + 1), toks.get(i + 2))
        else {
            return Ok(None);
        };
        if head.kind != TokenKind::Identifier
            || !dot.is_symbol('.')
            || member.kind != TokenKind::Identifier
        {
            return Ok(None);
        }

        if head.text == "global" {
            return Ok(Some((member.text.clone(), None)));
        }

        let dep = {
            let p = self.pkg.borrow();
            match p.import(&head.text).and_then(|r| r.package.clone()) {
                Some(dep) => dep,
                None => return Ok(None),
            }
        };

        let symbol = {
            let d = dep.borrow();
            match d.export(&member.text) {
                Some(e) if !e.symbol.is_empty() => e.symbol.clone(),
                _ => {
                    return Err(self.error_at(
                        SYNTAX,
                        member,
                        format!("'{}' has no export named '{}'", head.text, member.text),
                    ))
                }
            }
        };
        Ok(Some((symbol, Some(dep))))
    }

    fn member_at(&self, i: usize) -> Result<Option<(String, Option<PackageRef>)>> {
        self.member_in(&self.tokens, i)
    }

    /// Backend symbol for one of this module's own exported local names.
    fn local_symbol(&self, name: &str) -> Option<String> {
        self.pkg
            .borrow()
            .export_by_local(name)
            .map(|e| e.symbol.clone())
            .filter(|s| !s.is_empty())
    }

    fn emit(&mut self, text: &str) -> Result<()> {
        let mut p = self.pkg.borrow_mut();
        let generated = p.generated.clone();
        p.emit(text).map_err(|e| CompileError::io(generated, e))
    }

    pub(crate) fn package(&self) -> PackageRef {
        self.pkg.clone()
    }

    fn peek_significant(&self) -> Option<&Token> {
        self.tokens[self.pos..].iter().find(|t| !t.is_trivia())
    }

    /// Consume trivia and return the next meaningful token.
    pub(crate) fn next_significant(
        &mut self,
        category: &'static str,
        expected: &str,
    ) -> Result<Token> {
        while self.pos < self.tokens.len() {
            let tok = self.tokens[self.pos].clone();
            self.pos += 1;
            if tok.is_trivia() {
                continue;
            }
            return Ok(tok);
        }
        Err(self.error_here(
            category,
            &format!("Expecting {expected}, but reached the end of the file"),
        ))
    }

    pub(crate) fn expect_identifier(
        &mut self,
        category: &'static str,
        expected: &str,
    ) -> Result<Token> {
        let tok = self.next_significant(category, expected)?;
        if tok.kind != TokenKind::Identifier {
            return Err(self.error_at(
                category,
                &tok,
                format!("Expecting {expected}, but got '{}'", tok.text),
            ));
        }
        Ok(tok)
    }

    pub(crate) fn expect_quoted(
        &mut self,
        category: &'static str,
        expected: &str,
    ) -> Result<Token> {
        let tok = self.next_significant(category, expected)?;
        if tok.kind != TokenKind::QuotedString {
            return Err(self.error_at(
                category,
                &tok,
                format!("Expecting {expected}, but got '{}'", tok.text),
            ));
        }
        Ok(tok)
    }

    pub(crate) fn expect_semicolon(&mut self, category: &'static str) -> Result<()> {
        let tok = self.next_significant(category, "';'")?;
        if !tok.is_symbol(';') {
            return Err(self.error_at(
                category,
                &tok,
                format!("Expecting ';', but got '{}'", tok.text),
            ));
        }
        Ok(())
    }

    pub(crate) fn error_at(
        &self,
        category: &'static str,
        tok: &Token,
        message: String,
    ) -> CompileError {
        CompileError::Syntax {
            category,
            file: self.file.clone(),
            location: Location::of(self.source, tok.span.start),
            message,
        }
    }

    /// Error positioned at the most recently consumed token, or the end of
    /// the file when nothing has been consumed.
    fn error_here(&self, category: &'static str, message: &str) -> CompileError {
        let offset = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span.start)
            .unwrap_or(self.source.len());
        CompileError::Syntax {
            category,
            file: self.file.clone(),
            location: Location::of(self.source, offset),
            message: message.to_string(),
        }
    }
}

/// Find a trailing `as <alias>` on a declaration, returning the index of
/// the `as` token and the alias name.
fn trailing_alias(toks: &[Token]) -> Option<(usize, String)> {
    let sig: Vec<usize> = toks
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_trivia())
        .map(|(i, _)| i)
        .collect();
    if sig.len() < 2 {
        return None;
    }
    let a = sig[sig.len() - 2];
    let b = sig[sig.len() - 1];
    if toks[a].kind == TokenKind::Identifier
        && toks[a].text == "as"
        && toks[b].kind == TokenKind::Identifier
    {
        Some((a, toks[b].text.clone()))
    } else {
        None
    }
}
