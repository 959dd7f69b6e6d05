use crate::ast::{
    BinaryOp, Bound, ExprKind, ExprNode, Node, Param, Procedure, Program, StandardType, StmtKind,
    StmtNode, TypeSpec, UnaryOp, VarDecl, VarNode, Variable,
};
use crate::{CompileError, CompileResult, Token, TokenKind, P};

#[derive(Default)]
pub struct Parser {
    pub tokens: Vec<Token>,
    pub index: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::eof(line));
        }
        Self { tokens, index: 0 }
    }

    pub fn parse(&mut self) -> CompileResult<Program> {
        let program = self.program()?;
        self.ensure_done()?;
        Ok(program)
    }

    // program = "program" ident ";" var-decl? (procedure ";")* compound "."
    fn program(&mut self) -> CompileResult<Program> {
        let line = self.skip(TokenKind::Program)?.line;
        let name = self.skip(TokenKind::Identifier)?.text;
        self.skip(TokenKind::Semicolon)?;

        let vars = self.var_declaration()?;
        let mut procs = vec![];
        while self.is(TokenKind::Procedure) {
            procs.push(self.procedure()?);
            self.skip(TokenKind::Semicolon)?;
        }

        let body = self.compound_stmt()?;
        self.skip(TokenKind::Dot)?;

        Ok(Program {
            name,
            vars,
            procs,
            body,
            line,
        })
    }

    // var-decl = "var" (ident ("," ident)* ":" type ";")+
    fn var_declaration(&mut self) -> CompileResult<Vec<VarDecl>> {
        let mut vars = vec![];
        if !self.is(TokenKind::Var) {
            return Ok(vars);
        }
        self.advance();

        loop {
            let names = self.ident_list()?;
            self.skip(TokenKind::Colon)?;
            let r#type = self.type_spec()?;
            self.skip(TokenKind::Semicolon)?;

            for (name, line) in names {
                vars.push(VarDecl {
                    name,
                    r#type: r#type.clone(),
                    line,
                });
            }

            if !self.is(TokenKind::Identifier) {
                break;
            }
        }
        Ok(vars)
    }

    fn ident_list(&mut self) -> CompileResult<Vec<(String, usize)>> {
        let first = self.skip(TokenKind::Identifier)?;
        let mut names = vec![(first.text, first.line)];
        while self.is(TokenKind::Comma) {
            self.advance();
            let next = self.skip(TokenKind::Identifier)?;
            names.push((next.text, next.line));
        }
        Ok(names)
    }

    // type = standard-type | "array" "[" bound ".." bound "]" "of" standard-type
    fn type_spec(&mut self) -> CompileResult<Node<TypeSpec>> {
        let line = self.peek().line;
        if !self.is(TokenKind::Array) {
            let ty = self.standard_type()?;
            return Ok(Node::new(TypeSpec::Standard(ty), line));
        }

        self.advance();
        self.skip(TokenKind::LeftBracket)?;
        let min = self.bound()?;
        self.skip(TokenKind::Range)?;
        let max = self.bound()?;
        self.skip(TokenKind::RightBracket)?;
        self.skip(TokenKind::Of)?;
        let elem = self.standard_type()?;

        Ok(Node::new(TypeSpec::Array { min, max, elem }, line))
    }

    // standard-type = "integer" | "char" | "boolean"
    fn standard_type(&mut self) -> CompileResult<StandardType> {
        let ty = match self.peek().kind {
            TokenKind::Integer => StandardType::Integer,
            TokenKind::Char => StandardType::Char,
            TokenKind::Boolean => StandardType::Boolean,
            _ => return Err(self.error()),
        };
        self.advance();
        Ok(ty)
    }

    // bound = ("+" | "-")? number
    fn bound(&mut self) -> CompileResult<Bound> {
        let negative = match self.peek().kind {
            TokenKind::Plus => {
                self.advance();
                false
            }
            TokenKind::Minus => {
                self.advance();
                true
            }
            _ => false,
        };
        let token = self.skip(TokenKind::Constant)?;
        Ok(Bound {
            negative,
            magnitude: number_value(&token)?,
        })
    }

    // procedure = "procedure" ident ("(" params (";" params)* ")")? ";" var-decl? compound
    // params    = ident ("," ident)* ":" standard-type
    fn procedure(&mut self) -> CompileResult<Procedure> {
        self.skip(TokenKind::Procedure)?;
        let name = self.skip(TokenKind::Identifier)?;

        let mut params = vec![];
        if self.is(TokenKind::LeftParen) {
            self.advance();
            loop {
                let names = self.ident_list()?;
                self.skip(TokenKind::Colon)?;
                let ty = self.standard_type()?;
                for (param, line) in names {
                    params.push(Param {
                        name: param,
                        r#type: ty,
                        line,
                    });
                }
                if !self.is(TokenKind::Semicolon) {
                    break;
                }
                self.advance();
            }
            self.skip(TokenKind::RightParen)?;
        }
        self.skip(TokenKind::Semicolon)?;

        let vars = self.var_declaration()?;
        let body = self.compound_stmt()?;

        Ok(Procedure {
            name: name.text,
            params,
            vars,
            body,
            line: name.line,
        })
    }

    // compound = "begin" (stmt ";")* "end"
    fn compound_stmt(&mut self) -> CompileResult<StmtNode> {
        let line = self.skip(TokenKind::Begin)?.line;
        let mut stmts = vec![];
        while starts_statement(self.peek().kind) {
            stmts.push(self.stmt()?);
            self.skip(TokenKind::Semicolon)?;
        }
        self.skip(TokenKind::End)?;
        Ok(Node::new(StmtKind::Block(stmts), line))
    }

    // stmt = "if" expr "then" compound ("else" compound)?
    //      | "while" expr "do" compound
    //      | variable ":=" expr
    //      | ident ("(" expr ("," expr)* ")")?
    //      | "readln" ("(" variable ("," variable)* ")")?
    //      | "writeln" ("(" expr ("," expr)* ")")?
    //      | compound
    fn stmt(&mut self) -> CompileResult<StmtNode> {
        match self.peek().kind {
            TokenKind::If => {
                let line = self.advance().line;
                let cond = P::new(self.expr()?);
                self.skip(TokenKind::Then)?;
                let then = P::new(self.compound_stmt()?);
                let mut r#else = None;
                if self.is(TokenKind::Else) {
                    self.advance();
                    r#else = Some(P::new(self.compound_stmt()?));
                }
                Ok(Node::new(StmtKind::If(cond, then, r#else), line))
            }
            TokenKind::While => {
                let line = self.advance().line;
                let cond = P::new(self.expr()?);
                self.skip(TokenKind::Do)?;
                let body = P::new(self.compound_stmt()?);
                Ok(Node::new(StmtKind::While(cond, body), line))
            }
            TokenKind::Identifier => match self.peek_next().kind {
                TokenKind::LeftBracket | TokenKind::Assign => self.assignment(),
                _ => self.call(),
            },
            TokenKind::Readln => {
                let line = self.advance().line;
                let mut targets = vec![];
                if self.is(TokenKind::LeftParen) {
                    self.advance();
                    targets.push(self.variable()?);
                    while self.is(TokenKind::Comma) {
                        self.advance();
                        targets.push(self.variable()?);
                    }
                    self.skip(TokenKind::RightParen)?;
                }
                Ok(Node::new(StmtKind::Read(targets), line))
            }
            TokenKind::Writeln => {
                let line = self.advance().line;
                let mut values = vec![];
                if self.is(TokenKind::LeftParen) {
                    self.advance();
                    values = self.expr_list()?;
                    self.skip(TokenKind::RightParen)?;
                }
                Ok(Node::new(StmtKind::Write(values), line))
            }
            TokenKind::Begin => self.compound_stmt(),
            _ => Err(self.error()),
        }
    }

    fn assignment(&mut self) -> CompileResult<StmtNode> {
        let target = self.variable()?;
        let line = self.skip(TokenKind::Assign)?.line;
        let value = self.expr()?;
        Ok(Node::new(StmtKind::Assign(target, value), line))
    }

    fn call(&mut self) -> CompileResult<StmtNode> {
        let name = self.skip(TokenKind::Identifier)?;
        let mut args = vec![];
        if self.is(TokenKind::LeftParen) {
            self.advance();
            args = self.expr_list()?;
            self.skip(TokenKind::RightParen)?;
        }
        Ok(Node::new(StmtKind::Call(name.text, args), name.line))
    }

    // variable = ident ("[" expr "]")?
    fn variable(&mut self) -> CompileResult<VarNode> {
        let name = self.skip(TokenKind::Identifier)?;
        let mut index = None;
        if self.is(TokenKind::LeftBracket) {
            self.advance();
            index = Some(P::new(self.expr()?));
            self.skip(TokenKind::RightBracket)?;
        }
        Ok(Node::new(
            Variable {
                name: name.text,
                index,
            },
            name.line,
        ))
    }

    fn expr_list(&mut self) -> CompileResult<Vec<ExprNode>> {
        let mut exprs = vec![self.expr()?];
        while self.is(TokenKind::Comma) {
            self.advance();
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    // expr = simple (relop simple)?
    fn expr(&mut self) -> CompileResult<ExprNode> {
        let node = self.simple()?;

        let op = match self.peek().kind {
            TokenKind::Equal => BinaryOp::Eq,
            TokenKind::NotEqual => BinaryOp::Ne,
            TokenKind::Less => BinaryOp::Lt,
            TokenKind::LessEqual => BinaryOp::Le,
            TokenKind::Great => BinaryOp::Gt,
            TokenKind::GreatEqual => BinaryOp::Ge,
            _ => return Ok(node),
        };
        let line = self.advance().line;
        let rhs = self.simple()?;
        Ok(Node::new(
            ExprKind::Binary(op, P::new(node), P::new(rhs)),
            line,
        ))
    }

    // simple = ("+" | "-")? term (("+" | "-" | "or") term)*
    fn simple(&mut self) -> CompileResult<ExprNode> {
        let sign = match self.peek().kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };
        let mut node = match sign {
            Some(op) => {
                let line = self.advance().line;
                let operand = P::new(self.term()?);
                Node::new(ExprKind::Unary(op, operand), line)
            }
            None => self.term()?,
        };

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Or => BinaryOp::Or,
                _ => break,
            };
            let line = self.advance().line;
            let rhs = P::new(self.term()?);
            node = Node::new(ExprKind::Binary(op, P::new(node), rhs), line);
        }

        Ok(node)
    }

    // term = factor (("*" | "/" | "div" | "mod" | "and") factor)*
    fn term(&mut self) -> CompileResult<ExprNode> {
        let mut node = self.factor()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Div => BinaryOp::Div,
                TokenKind::Mod => BinaryOp::Mod,
                TokenKind::And => BinaryOp::And,
                _ => break,
            };
            let line = self.advance().line;
            let rhs = P::new(self.factor()?);
            node = Node::new(ExprKind::Binary(op, P::new(node), rhs), line);
        }

        Ok(node)
    }

    // factor = variable | "(" expr ")" | "not" factor | number | string | "true" | "false"
    fn factor(&mut self) -> CompileResult<ExprNode> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier => {
                let var = self.variable()?;
                Ok(Node::new(ExprKind::Var(var.kind), var.line))
            }
            TokenKind::LeftParen => {
                self.advance();
                let node = self.expr()?;
                self.skip(TokenKind::RightParen)?;
                Ok(node)
            }
            TokenKind::Not => {
                self.advance();
                let operand = P::new(self.factor()?);
                Ok(Node::new(ExprKind::Unary(UnaryOp::Not, operand), token.line))
            }
            TokenKind::Constant => {
                self.advance();
                Ok(Node::new(ExprKind::Number(number_value(&token)?), token.line))
            }
            TokenKind::Str => {
                self.advance();
                Ok(Node::new(ExprKind::Str(unquote(&token)?), token.line))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                let value = token.kind == TokenKind::True;
                Ok(Node::new(ExprKind::Bool(value), token.line))
            }
            _ => Err(self.error()),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> &Token {
        &self.tokens[(self.index + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.index += 1;
        }
        token
    }

    fn is(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn skip(&mut self, kind: TokenKind) -> CompileResult<Token> {
        if !self.is(kind) {
            return Err(self.error());
        }
        Ok(self.advance())
    }

    fn ensure_done(&self) -> CompileResult<()> {
        match self.peek().kind {
            TokenKind::Eof => Ok(()),
            _ => Err(self.error()),
        }
    }

    fn error(&self) -> CompileError {
        CompileError::Syntax {
            line: self.peek().line,
        }
    }
}

fn starts_statement(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::If
            | TokenKind::While
            | TokenKind::Identifier
            | TokenKind::Readln
            | TokenKind::Writeln
            | TokenKind::Begin
    )
}

// Literals too long for i64 saturate; the checker rejects them either way.
fn number_value(token: &Token) -> CompileResult<i64> {
    if token.text.is_empty() || !token.text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CompileError::Syntax { line: token.line });
    }
    Ok(token.text.parse().unwrap_or(i64::MAX))
}

fn unquote(token: &Token) -> CompileResult<String> {
    token
        .text
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .map(|inner| inner.replace("''", "'"))
        .ok_or(CompileError::Syntax { line: token.line })
}
