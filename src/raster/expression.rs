//! Band-math expressions
//!
//! Arithmetic over named bands, e.g. `2.5 * ((NIR - RED) / (NIR + 6 * RED - 7.5 * BLUE + 1))`.
//! Supported: numbers, band identifiers, `+ - * /`, unary minus and
//! parentheses. Evaluation is per pixel; an unavailable input anywhere in
//! the expression makes the result unavailable.

use std::collections::BTreeSet;
use std::fmt;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(
        r"^\s*(?:(?P<num>(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)|(?P<ident>[A-Za-z_][A-Za-z0-9_]*)|(?P<op>[-+*/()]))"
    ).expect("token pattern is valid");
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(f64),
    Band(String),
    Neg(Box<Node>),
    Binary(char, Box<Node>, Box<Node>),
}

/// A parsed band-math expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    /// Parse an expression
    pub fn parse(source: &str) -> Result<Self, String> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err("Expression is empty".to_string());
        }

        let mut parser = Parser { tokens: &tokens, pos: 0 };
        let root = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(format!("Unexpected token {:?} in '{}'", tokens[parser.pos], source));
        }

        Ok(Expression { source: source.to_string(), root })
    }

    /// `(a - b) / (a + b)`
    pub fn normalized_difference(a: &str, b: &str) -> Result<Self, String> {
        Expression::parse(&format!("({a} - {b}) / ({a} + {b})"))
    }

    /// Band names referenced by the expression
    pub fn variables(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        collect_vars(&self.root, &mut vars);
        vars
    }

    /// Evaluate with band values supplied by `lookup`
    ///
    /// Returns `None` if any referenced band is unavailable or the result is
    /// not finite (e.g. division by zero).
    pub fn evaluate<F>(&self, lookup: &F) -> Option<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        eval(&self.root, lookup).filter(|v| v.is_finite())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while !rest.trim_start().is_empty() {
        let caps = TOKEN.captures(rest)
            .ok_or_else(|| format!("Invalid character near '{}'", rest.trim_start()))?;

        if let Some(num) = caps.name("num") {
            let value = num.as_str().parse::<f64>()
                .map_err(|_| format!("Invalid number '{}'", num.as_str()))?;
            tokens.push(Token::Number(value));
        } else if let Some(ident) = caps.name("ident") {
            tokens.push(Token::Ident(ident.as_str().to_string()));
        } else if let Some(op) = caps.name("op") {
            tokens.push(Token::Op(op.as_str().chars().next().unwrap_or('+')));
        }

        rest = &rest[caps[0].len()..];
    }

    Ok(tokens)
}

/// Recursive-descent parser over the token stream
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn peek_op(&self) -> Option<char> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(c)) => Some(*c),
            _ => None,
        }
    }

    fn expr(&mut self) -> Result<Node, String> {
        let mut node = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek_op() {
            self.pos += 1;
            let rhs = self.term()?;
            node = Node::Binary(op, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn term(&mut self) -> Result<Node, String> {
        let mut node = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek_op() {
            self.pos += 1;
            let rhs = self.factor()?;
            node = Node::Binary(op, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn factor(&mut self) -> Result<Node, String> {
        let token = self.tokens.get(self.pos).cloned()
            .ok_or_else(|| "Unexpected end of expression".to_string())?;
        self.pos += 1;

        match token {
            Token::Number(v) => Ok(Node::Number(v)),
            Token::Ident(name) => Ok(Node::Band(name)),
            Token::Op('-') => Ok(Node::Neg(Box::new(self.factor()?))),
            Token::Op('+') => self.factor(),
            Token::Op('(') => {
                let inner = self.expr()?;
                if self.peek_op() != Some(')') {
                    return Err("Missing closing parenthesis".to_string());
                }
                self.pos += 1;
                Ok(inner)
            }
            Token::Op(c) => Err(format!("Unexpected operator '{}'", c)),
        }
    }
}

fn collect_vars(node: &Node, vars: &mut BTreeSet<String>) {
    match node {
        Node::Number(_) => {}
        Node::Band(name) => {
            vars.insert(name.clone());
        }
        Node::Neg(inner) => collect_vars(inner, vars),
        Node::Binary(_, lhs, rhs) => {
            collect_vars(lhs, vars);
            collect_vars(rhs, vars);
        }
    }
}

fn eval<F>(node: &Node, lookup: &F) -> Option<f64>
where
    F: Fn(&str) -> Option<f64>,
{
    match node {
        Node::Number(v) => Some(*v),
        Node::Band(name) => lookup(name),
        Node::Neg(inner) => eval(inner, lookup).map(|v| -v),
        Node::Binary(op, lhs, rhs) => {
            let a = eval(lhs, lookup)?;
            let b = eval(rhs, lookup)?;
            match op {
                '+' => Some(a + b),
                '-' => Some(a - b),
                '*' => Some(a * b),
                '/' if b == 0.0 => None,
                '/' => Some(a / b),
                _ => None,
            }
        }
    }
}
