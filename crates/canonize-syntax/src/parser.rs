//! tree-sitter-python lowering into the owned [`Module`] tree
//!
//! Any `ERROR` or `MISSING` node in the concrete tree is a parse failure:
//! the engine only rewrites fragments the grammar accepts in full.

use tree_sitter::Node;

use crate::ast::{
    Alias, Arg, BinOp, BoolOp, CmpOp, Comprehension, ComprehensionClause, ComprehensionKind,
    ExceptHandler, Expr, FunctionDef, Module, Param, ParamKind, Stmt, StrLit, UnaryOp,
};

/// Parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The grammar could not be loaded
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// tree-sitter returned no tree
    #[error("parse failed")]
    ParseFailed,

    /// Source contains a syntax error
    #[error("syntax error at {line}:{column}: {message}")]
    SyntaxError {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// Description of the offending node
        message: String,
    },
}

/// Parse Python source into a [`Module`]
///
/// # Errors
/// Returns [`ParseError::SyntaxError`] if the grammar rejects any part of the
/// source, or an initialization error if the grammar cannot be loaded.
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ParseError::ParserInit(e.to_string()))?;

    let tree = parser.parse(source, None).ok_or(ParseError::ParseFailed)?;
    let root = tree.root_node();

    if root.has_error() {
        let (line, column, message) = match first_error(root) {
            Some(node) => {
                let position = node.start_position();
                let message = if node.is_missing() {
                    format!("missing {}", node.kind())
                } else {
                    "unexpected syntax".to_string()
                };
                (position.row + 1, position.column + 1, message)
            }
            None => (1, 1, "unexpected syntax".to_string()),
        };
        return Err(ParseError::SyntaxError {
            line,
            column,
            message,
        });
    }

    let lowering = Lowering {
        source: source.as_bytes(),
    };
    Ok(Module::new(lowering.block(Some(root))))
}

/// Whether `source` parses without syntax errors
#[must_use]
pub fn is_parseable(source: &str) -> bool {
    parse_module(source).is_ok()
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn all_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn has_child_kind(node: Node<'_>, kind: &str) -> bool {
    all_children(node).iter().any(|child| child.kind() == kind)
}

struct Lowering<'a> {
    source: &'a [u8],
}

impl<'a> Lowering<'a> {
    fn text(&self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.source).unwrap_or("")
    }

    fn dedented(&self, node: Node<'_>) -> String {
        let column = node.start_position().column;
        self.text(node)
            .lines()
            .enumerate()
            .map(|(i, line)| {
                if i == 0 {
                    line.to_string()
                } else {
                    let indent = line.len() - line.trim_start_matches(' ').len();
                    line[indent.min(column)..].to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn opaque_stmt(&self, node: Node<'_>, binds: Vec<String>) -> Stmt {
        Stmt::Opaque {
            kind: node.kind().to_string(),
            text: self.dedented(node),
            binds,
        }
    }

    fn opaque_expr(&self, node: Node<'_>) -> Expr {
        Expr::Opaque(self.text(node).to_string())
    }

    fn block(&self, node: Option<Node<'_>>) -> Vec<Stmt> {
        let Some(node) = node else {
            return Vec::new();
        };
        named_children(node)
            .into_iter()
            .map(|child| self.stmt(child))
            .collect()
    }

    fn clause_body(&self, clause: Option<Node<'_>>) -> Vec<Stmt> {
        let Some(clause) = clause else {
            return Vec::new();
        };
        let body = clause.child_by_field_name("body").or_else(|| {
            named_children(clause)
                .into_iter()
                .find(|child| child.kind() == "block")
        });
        self.block(body)
    }

    fn stmt(&self, node: Node<'_>) -> Stmt {
        match node.kind() {
            "function_definition" => Stmt::FunctionDef(self.function(node, Vec::new())),
            "decorated_definition" => self.decorated(node),
            "class_definition" => {
                let binds = node
                    .child_by_field_name("name")
                    .map(|name| vec![self.text(name).to_string()])
                    .unwrap_or_default();
                self.opaque_stmt(node, binds)
            }
            "return_statement" => Stmt::Return(
                named_children(node)
                    .into_iter()
                    .next()
                    .map(|value| self.expr(value)),
            ),
            "expression_statement" => self.expression_statement(node),
            "if_statement" => self.if_statement(node),
            "for_statement" => self.for_statement(node),
            "while_statement" => Stmt::While {
                test: self.field_expr(node, "condition"),
                body: self.block(node.child_by_field_name("body")),
                orelse: self.clause_body(node.child_by_field_name("alternative")),
            },
            "try_statement" => self.try_statement(node),
            "raise_statement" => {
                let cause = node.child_by_field_name("cause");
                let exc = named_children(node)
                    .into_iter()
                    .find(|child| Some(*child) != cause)
                    .map(|exc| self.expr(exc));
                Stmt::Raise {
                    exc,
                    cause: cause.map(|c| self.expr(c)),
                }
            }
            "assert_statement" => {
                let mut parts = named_children(node).into_iter().map(|c| self.expr(c));
                match parts.next() {
                    Some(test) => Stmt::Assert {
                        test,
                        msg: parts.next(),
                    },
                    None => self.opaque_stmt(node, Vec::new()),
                }
            }
            "import_statement" => Stmt::Import(
                field_children(node, "name")
                    .into_iter()
                    .map(|name| self.alias(name))
                    .collect(),
            ),
            "import_from_statement" => self.import_from(node),
            "global_statement" => Stmt::Global(self.identifiers(node)),
            "nonlocal_statement" => Stmt::Nonlocal(self.identifiers(node)),
            "pass_statement" => Stmt::Pass,
            "break_statement" => Stmt::Break,
            "continue_statement" => Stmt::Continue,
            _ => self.opaque_stmt(node, Vec::new()),
        }
    }

    fn identifiers(&self, node: Node<'_>) -> Vec<String> {
        named_children(node)
            .into_iter()
            .map(|child| self.text(child).to_string())
            .collect()
    }

    fn alias(&self, node: Node<'_>) -> Alias {
        if node.kind() == "aliased_import" {
            Alias {
                name: node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
                asname: node
                    .child_by_field_name("alias")
                    .map(|n| self.text(n).to_string()),
            }
        } else {
            Alias {
                name: self.text(node).to_string(),
                asname: None,
            }
        }
    }

    fn import_from(&self, node: Node<'_>) -> Stmt {
        if has_child_kind(node, "wildcard_import") {
            return self.opaque_stmt(node, Vec::new());
        }
        let module = node
            .child_by_field_name("module_name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let names = field_children(node, "name")
            .into_iter()
            .map(|name| self.alias(name))
            .collect();
        Stmt::ImportFrom { module, names }
    }

    fn decorated(&self, node: Node<'_>) -> Stmt {
        let decorators = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "decorator")
            .filter_map(|decorator| named_children(decorator).into_iter().next())
            .map(|expr| self.expr(expr))
            .collect();
        match node.child_by_field_name("definition") {
            Some(def) if def.kind() == "function_definition" => {
                Stmt::FunctionDef(self.function(def, decorators))
            }
            Some(def) => {
                let binds = def
                    .child_by_field_name("name")
                    .map(|name| vec![self.text(name).to_string()])
                    .unwrap_or_default();
                Stmt::Opaque {
                    kind: def.kind().to_string(),
                    text: self.dedented(node),
                    binds,
                }
            }
            None => self.opaque_stmt(node, Vec::new()),
        }
    }

    fn function(&self, node: Node<'_>, decorators: Vec<Expr>) -> FunctionDef {
        FunctionDef {
            name: node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            params: node
                .child_by_field_name("parameters")
                .map(|p| self.params(p))
                .unwrap_or_default(),
            body: self.block(node.child_by_field_name("body")),
            decorators,
            returns: node
                .child_by_field_name("return_type")
                .map(|t| self.opaque_expr(t)),
            is_async: has_child_kind(node, "async"),
        }
    }

    fn params(&self, node: Node<'_>) -> Vec<Param> {
        named_children(node)
            .into_iter()
            .map(|param| self.param(param))
            .collect()
    }

    fn param(&self, node: Node<'_>) -> Param {
        let name_of = |n: Option<Node<'_>>| n.map(|n| self.text(n).to_string()).unwrap_or_default();
        match node.kind() {
            "default_parameter" => Param {
                name: name_of(node.child_by_field_name("name")),
                kind: ParamKind::Regular,
                default: node.child_by_field_name("value").map(|v| self.expr(v)),
                annotation: None,
            },
            "typed_default_parameter" => Param {
                name: name_of(node.child_by_field_name("name")),
                kind: ParamKind::Regular,
                default: node.child_by_field_name("value").map(|v| self.expr(v)),
                annotation: node.child_by_field_name("type").map(|t| self.opaque_expr(t)),
            },
            "typed_parameter" => {
                let annotation = node.child_by_field_name("type").map(|t| self.opaque_expr(t));
                let inner = named_children(node)
                    .into_iter()
                    .find(|child| child.kind() != "type");
                let mut param = match inner {
                    Some(inner) if inner.kind() != "identifier" => self.param(inner),
                    other => Param::regular(name_of(other)),
                };
                param.annotation = annotation;
                param
            }
            "list_splat_pattern" => Param {
                kind: ParamKind::VarArgs,
                ..Param::regular(name_of(named_children(node).into_iter().next()))
            },
            "dictionary_splat_pattern" => Param {
                kind: ParamKind::KwArgs,
                ..Param::regular(name_of(named_children(node).into_iter().next()))
            },
            "keyword_separator" => Param {
                kind: ParamKind::KeywordOnlyMarker,
                ..Param::regular("")
            },
            "positional_separator" => Param {
                kind: ParamKind::PositionalOnlyMarker,
                ..Param::regular("")
            },
            _ => Param::regular(self.text(node)),
        }
    }

    fn expression_statement(&self, node: Node<'_>) -> Stmt {
        let children = named_children(node);
        match children.as_slice() {
            [single] if single.kind() == "assignment" => self.assignment(*single),
            [single] if single.kind() == "augmented_assignment" => self.aug_assignment(*single),
            [single] => Stmt::Expr(self.expr(*single)),
            _ => Stmt::Expr(Expr::Tuple(
                children.into_iter().map(|c| self.expr(c)).collect(),
            )),
        }
    }

    fn assignment(&self, node: Node<'_>) -> Stmt {
        let (Some(left), Some(mut right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) else {
            return self.opaque_stmt(node, Vec::new());
        };
        let annotation = node.child_by_field_name("type").map(|t| self.opaque_expr(t));
        let mut targets = vec![self.expr(left)];
        while right.kind() == "assignment" {
            let (Some(next_left), Some(next_right)) = (
                right.child_by_field_name("left"),
                right.child_by_field_name("right"),
            ) else {
                return self.opaque_stmt(node, Vec::new());
            };
            targets.push(self.expr(next_left));
            right = next_right;
        }
        if right.kind() == "augmented_assignment" {
            return self.opaque_stmt(node, Vec::new());
        }
        Stmt::Assign {
            annotation: if targets.len() == 1 { annotation } else { None },
            targets,
            value: self.expr(right),
        }
    }

    fn aug_assignment(&self, node: Node<'_>) -> Stmt {
        let op = node
            .child_by_field_name("operator")
            .map(|op| self.text(op).trim_end_matches('='))
            .and_then(BinOp::from_symbol);
        match (
            node.child_by_field_name("left"),
            op,
            node.child_by_field_name("right"),
        ) {
            (Some(left), Some(op), Some(right)) => Stmt::AugAssign {
                target: self.expr(left),
                op,
                value: self.expr(right),
            },
            _ => self.opaque_stmt(node, Vec::new()),
        }
    }

    fn if_statement(&self, node: Node<'_>) -> Stmt {
        let mut orelse = Vec::new();
        for alternative in field_children(node, "alternative").into_iter().rev() {
            orelse = match alternative.kind() {
                "elif_clause" => vec![Stmt::If {
                    test: self.field_expr(alternative, "condition"),
                    body: self.block(alternative.child_by_field_name("consequence")),
                    orelse,
                }],
                _ => self.clause_body(Some(alternative)),
            };
        }
        Stmt::If {
            test: self.field_expr(node, "condition"),
            body: self.block(node.child_by_field_name("consequence")),
            orelse,
        }
    }

    fn for_statement(&self, node: Node<'_>) -> Stmt {
        if has_child_kind(node, "async") {
            return self.opaque_stmt(node, Vec::new());
        }
        Stmt::For {
            target: self.field_expr(node, "left"),
            iter: self.field_expr(node, "right"),
            body: self.block(node.child_by_field_name("body")),
            orelse: self.clause_body(node.child_by_field_name("alternative")),
        }
    }

    fn try_statement(&self, node: Node<'_>) -> Stmt {
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "except_clause" => handlers.push(self.except_clause(child)),
                "else_clause" => orelse = self.clause_body(Some(child)),
                "finally_clause" => finalbody = self.clause_body(Some(child)),
                "except_group_clause" => return self.opaque_stmt(node, Vec::new()),
                _ => {}
            }
        }
        Stmt::Try {
            body: self.block(node.child_by_field_name("body")),
            handlers,
            orelse,
            finalbody,
        }
    }

    fn except_clause(&self, node: Node<'_>) -> ExceptHandler {
        let mut body = Vec::new();
        let mut exprs = Vec::new();
        for child in named_children(node) {
            if child.kind() == "block" {
                body = self.block(Some(child));
            } else {
                exprs.push(child);
            }
        }
        let (ty, name) = match exprs.as_slice() {
            [pattern] if pattern.kind() == "as_pattern" => {
                let parts = named_children(*pattern);
                (
                    parts.first().map(|t| self.expr(*t)),
                    pattern
                        .child_by_field_name("alias")
                        .or_else(|| parts.get(1).copied())
                        .map(|n| self.text(n).to_string()),
                )
            }
            [ty] => (Some(self.expr(*ty)), None),
            [ty, name, ..] => (Some(self.expr(*ty)), Some(self.text(*name).to_string())),
            [] => (None, None),
        };
        ExceptHandler { ty, name, body }
    }

    fn field_expr(&self, node: Node<'_>, field: &str) -> Expr {
        match node.child_by_field_name(field) {
            Some(child) => self.expr(child),
            None => Expr::Opaque(String::new()),
        }
    }

    fn exprs(&self, nodes: Vec<Node<'_>>) -> Vec<Expr> {
        nodes.into_iter().map(|n| self.expr(n)).collect()
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        match node.kind() {
            "identifier" | "keyword_identifier" => Expr::Name(self.text(node).to_string()),
            "integer" => parse_int(self.text(node)).map_or_else(|| self.opaque_expr(node), Expr::Int),
            "float" => parse_float(self.text(node)).map_or_else(|| self.opaque_expr(node), Expr::Float),
            "true" => Expr::Bool(true),
            "false" => Expr::Bool(false),
            "none" => Expr::NoneLit,
            "string" => parse_string(self.text(node)).map_or_else(|| self.opaque_expr(node), Expr::Str),
            "concatenated_string" => {
                let mut value = String::new();
                let mut bytes = false;
                for part in named_children(node) {
                    match parse_string(self.text(part)) {
                        Some(lit) => {
                            value.push_str(&lit.value);
                            bytes |= lit.bytes;
                        }
                        None => return self.opaque_expr(node),
                    }
                }
                Expr::Str(StrLit {
                    value,
                    raw: false,
                    bytes,
                })
            }
            "binary_operator" => {
                let op = node
                    .child_by_field_name("operator")
                    .and_then(|op| BinOp::from_symbol(self.text(op)));
                match (op, node.child_by_field_name("left"), node.child_by_field_name("right")) {
                    (Some(op), Some(left), Some(right)) => {
                        Expr::binop(self.expr(left), op, self.expr(right))
                    }
                    _ => self.opaque_expr(node),
                }
            }
            "unary_operator" => {
                let op = match node.child_by_field_name("operator").map(|op| self.text(op)) {
                    Some("-") => UnaryOp::Neg,
                    Some("+") => UnaryOp::Pos,
                    Some("~") => UnaryOp::Invert,
                    _ => return self.opaque_expr(node),
                };
                Expr::Unary {
                    op,
                    operand: Box::new(self.field_expr(node, "argument")),
                }
            }
            "not_operator" => Expr::not(self.field_expr(node, "argument")),
            "boolean_operator" => {
                let op = match node.child_by_field_name("operator").map(|op| self.text(op)) {
                    Some("and") => BoolOp::And,
                    Some("or") => BoolOp::Or,
                    _ => return self.opaque_expr(node),
                };
                Expr::BoolOp {
                    op,
                    left: Box::new(self.field_expr(node, "left")),
                    right: Box::new(self.field_expr(node, "right")),
                }
            }
            "comparison_operator" => self.comparison(node),
            "call" => self.call(node),
            "attribute" => match node.child_by_field_name("attribute") {
                Some(attr) => Expr::Attribute {
                    value: Box::new(self.field_expr(node, "object")),
                    attr: self.text(attr).to_string(),
                },
                None => self.opaque_expr(node),
            },
            "subscript" => {
                let mut indices = self.exprs(field_children(node, "subscript"));
                let index = if indices.len() == 1 {
                    indices.remove(0)
                } else {
                    Expr::Tuple(indices)
                };
                Expr::Subscript {
                    value: Box::new(self.field_expr(node, "value")),
                    index: Box::new(index),
                }
            }
            "slice" => self.slice(node),
            "list" | "list_pattern" => Expr::List(self.exprs(named_children(node))),
            "tuple" | "tuple_pattern" | "expression_list" | "pattern_list" => {
                Expr::Tuple(self.exprs(named_children(node)))
            }
            "set" => Expr::Set(self.exprs(named_children(node))),
            "dictionary" => {
                let mut pairs = Vec::new();
                for child in named_children(node) {
                    let key = child.child_by_field_name("key");
                    let value = child.child_by_field_name("value");
                    match (child.kind(), key, value) {
                        ("pair", Some(key), Some(value)) => {
                            pairs.push((self.expr(key), self.expr(value)));
                        }
                        _ => return self.opaque_expr(node),
                    }
                }
                Expr::Dict(pairs)
            }
            "list_comprehension" => self.comprehension(node, ComprehensionKind::List),
            "set_comprehension" => self.comprehension(node, ComprehensionKind::Set),
            "dictionary_comprehension" => self.comprehension(node, ComprehensionKind::Dict),
            "generator_expression" => self.comprehension(node, ComprehensionKind::Generator),
            "parenthesized_expression" => match named_children(node).as_slice() {
                [inner] if inner.kind() != "yield" => self.expr(*inner),
                _ => self.opaque_expr(node),
            },
            "conditional_expression" => match named_children(node).as_slice() {
                [body, test, orelse] => Expr::IfExp {
                    test: Box::new(self.expr(*test)),
                    body: Box::new(self.expr(*body)),
                    orelse: Box::new(self.expr(*orelse)),
                },
                _ => self.opaque_expr(node),
            },
            "lambda" => Expr::Lambda {
                params: node
                    .child_by_field_name("parameters")
                    .map(|p| self.params(p))
                    .unwrap_or_default(),
                body: Box::new(self.field_expr(node, "body")),
            },
            "list_splat" | "list_splat_pattern" => match named_children(node).into_iter().next() {
                Some(inner) => Expr::Starred(Box::new(self.expr(inner))),
                None => self.opaque_expr(node),
            },
            _ => self.opaque_expr(node),
        }
    }

    fn comparison(&self, node: Node<'_>) -> Expr {
        let mut operands = Vec::new();
        let mut ops = Vec::new();
        // `not in` / `is not` may arrive as one aliased token or as two
        let mut pending: Option<String> = None;
        for child in all_children(node) {
            if child.kind() == "comment" {
                continue;
            }
            if child.is_named() {
                if let Some(symbol) = pending.take() {
                    match CmpOp::from_symbol(&symbol) {
                        Some(op) => ops.push(op),
                        None => return self.opaque_expr(node),
                    }
                }
                operands.push(self.expr(child));
            } else {
                let symbol = self.text(child).split_whitespace().collect::<Vec<_>>().join(" ");
                pending = Some(match pending.take() {
                    Some(prev) => format!("{prev} {symbol}"),
                    None => symbol,
                });
            }
        }
        if pending.is_some() {
            return self.opaque_expr(node);
        }
        if operands.len() != ops.len() + 1 || ops.is_empty() {
            return self.opaque_expr(node);
        }
        let left = operands.remove(0);
        Expr::Compare {
            left: Box::new(left),
            ops,
            comparators: operands,
        }
    }

    fn call(&self, node: Node<'_>) -> Expr {
        let func = self.field_expr(node, "function");
        let Some(arguments) = node.child_by_field_name("arguments") else {
            return self.opaque_expr(node);
        };
        let args = if arguments.kind() == "generator_expression" {
            vec![Arg::Positional(self.expr(arguments))]
        } else {
            let mut args = Vec::new();
            for child in named_children(arguments) {
                let arg = match child.kind() {
                    "keyword_argument" => match child.child_by_field_name("name") {
                        Some(name) => Arg::Keyword {
                            name: self.text(name).to_string(),
                            value: self.field_expr(child, "value"),
                        },
                        None => return self.opaque_expr(node),
                    },
                    "list_splat" => match named_children(child).into_iter().next() {
                        Some(inner) => Arg::Star(self.expr(inner)),
                        None => return self.opaque_expr(node),
                    },
                    "dictionary_splat" => match named_children(child).into_iter().next() {
                        Some(inner) => Arg::DoubleStar(self.expr(inner)),
                        None => return self.opaque_expr(node),
                    },
                    _ => Arg::Positional(self.expr(child)),
                };
                args.push(arg);
            }
            args
        };
        Expr::Call {
            func: Box::new(func),
            args,
        }
    }

    fn slice(&self, node: Node<'_>) -> Expr {
        let mut parts: [Option<Box<Expr>>; 3] = [None, None, None];
        let mut position = 0usize;
        for child in all_children(node) {
            if child.kind() == ":" {
                position += 1;
            } else if child.is_named() && child.kind() != "comment" && position < 3 {
                parts[position] = Some(Box::new(self.expr(child)));
            }
        }
        let [lower, upper, step] = parts;
        Expr::Slice { lower, upper, step }
    }

    fn comprehension(&self, node: Node<'_>, kind: ComprehensionKind) -> Expr {
        let Some(body) = node.child_by_field_name("body") else {
            return self.opaque_expr(node);
        };
        let (element, value) = if kind == ComprehensionKind::Dict {
            match (body.child_by_field_name("key"), body.child_by_field_name("value")) {
                (Some(key), Some(value)) => (self.expr(key), Some(self.expr(value))),
                _ => return self.opaque_expr(node),
            }
        } else {
            (self.expr(body), None)
        };

        let mut clauses: Vec<ComprehensionClause> = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "for_in_clause" => {
                    if has_child_kind(child, "async") {
                        return self.opaque_expr(node);
                    }
                    let mut iters = self.exprs(field_children(child, "right"));
                    let iter = if iters.len() == 1 {
                        iters.remove(0)
                    } else {
                        Expr::Tuple(iters)
                    };
                    clauses.push(ComprehensionClause {
                        target: self.field_expr(child, "left"),
                        iter,
                        ifs: Vec::new(),
                    });
                }
                "if_clause" => {
                    let Some(cond) = named_children(child).into_iter().next() else {
                        return self.opaque_expr(node);
                    };
                    match clauses.last_mut() {
                        Some(clause) => clause.ifs.push(self.expr(cond)),
                        None => return self.opaque_expr(node),
                    }
                }
                _ => {}
            }
        }
        if clauses.is_empty() {
            return self.opaque_expr(node);
        }
        Expr::Comprehension(Box::new(Comprehension {
            kind,
            element,
            value,
            clauses,
        }))
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .trim_end_matches(['l', 'L'])
        .to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = cleaned.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(oct) = cleaned.strip_prefix("0o") {
        (oct, 8)
    } else if let Some(bin) = cleaned.strip_prefix("0b") {
        (bin, 2)
    } else {
        (cleaned.as_str(), 10)
    };
    i64::from_str_radix(digits, radix).ok()
}

fn parse_float(text: &str) -> Option<f64> {
    if text.ends_with(['j', 'J']) {
        return None;
    }
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Decode a Python string literal; `None` for f-strings
fn parse_string(text: &str) -> Option<StrLit> {
    let quote_start = text.find(['\'', '"'])?;
    let prefix = text[..quote_start].to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('t') {
        return None;
    }
    let body = &text[quote_start..];
    let quote_len = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        3
    } else {
        1
    };
    if body.len() < quote_len * 2 {
        return None;
    }
    let content = &body[quote_len..body.len() - quote_len];
    let raw = prefix.contains('r');
    Some(StrLit {
        value: if raw {
            content.to_string()
        } else {
            decode_escapes(content)
        },
        raw,
        bytes: prefix.contains('b'),
    })
}

fn decode_escapes(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            'x' | 'u' | 'U' => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = (0..width).filter_map(|_| chars.next()).collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if digits.len() == width => out.push(decoded),
                    _ => {
                        out.push('\\');
                        out.push(next);
                        out.push_str(&digits);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_function(source: &str) -> FunctionDef {
        let module = parse_module(source).unwrap();
        module.primary_function().cloned().unwrap()
    }

    #[test]
    fn parses_simple_function() {
        let def = only_function("def f(n):\n    r = n * 2\n    return r\n");
        assert_eq!(def.name, "f");
        assert_eq!(def.param_names().collect::<Vec<_>>(), vec!["n"]);
        assert_eq!(def.body.len(), 2);
        assert!(matches!(
            &def.body[0],
            Stmt::Assign { targets, value: Expr::BinOp { op: BinOp::Mul, .. }, .. }
                if targets[0].is_name("r")
        ));
        assert!(matches!(&def.body[1], Stmt::Return(Some(Expr::Name(n))) if n == "r"));
    }

    #[test]
    fn syntax_error_is_reported_with_position() {
        let err = parse_module("def f(:\n    return 1\n").unwrap_err();
        assert!(matches!(err, ParseError::SyntaxError { line: 1, .. }));
    }

    #[test]
    fn elif_chain_folds_into_orelse() {
        let def = only_function(
            "def sign(x):\n    if x > 0:\n        return 1\n    elif x < 0:\n        return -1\n    else:\n        return 0\n",
        );
        let Stmt::If { orelse, .. } = &def.body[0] else {
            panic!("expected if");
        };
        assert!(matches!(&orelse[..], [Stmt::If { orelse, .. }] if orelse.len() == 1));
    }

    #[test]
    fn comparison_chain_and_membership() {
        let def = only_function("def f(a, b, c):\n    return a < b <= c and a not in c\n");
        let Stmt::Return(Some(Expr::BoolOp { left, right, .. })) = &def.body[0] else {
            panic!("expected boolean operator");
        };
        assert!(matches!(&**left, Expr::Compare { ops, .. } if ops == &[CmpOp::Lt, CmpOp::LtE]));
        assert!(matches!(&**right, Expr::Compare { ops, .. } if ops == &[CmpOp::NotIn]));
    }

    #[test]
    fn comprehension_clauses_collect_filters() {
        let def = only_function("def f(xs):\n    return [x * 2 for x in xs if x > 0]\n");
        let Stmt::Return(Some(Expr::Comprehension(comp))) = &def.body[0] else {
            panic!("expected comprehension");
        };
        assert_eq!(comp.kind, ComprehensionKind::List);
        assert_eq!(comp.clauses.len(), 1);
        assert_eq!(comp.clauses[0].ifs.len(), 1);
    }

    #[test]
    fn string_prefixes_and_escapes() {
        assert_eq!(parse_string(r"'a\nb'").unwrap().value, "a\nb");
        let raw = parse_string(r"r'^\d+$'").unwrap();
        assert!(raw.raw);
        assert_eq!(raw.value, r"^\d+$");
        assert!(parse_string("f'{x}'").is_none());
        assert_eq!(parse_string(r#""""doc""""#).unwrap().value, "doc");
    }

    #[test]
    fn integer_forms() {
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("99999999999999999999"), None);
    }

    #[test]
    fn comments_are_dropped() {
        let def = only_function("def f(x):\n    # note\n    return x  # trailing\n");
        assert_eq!(def.body.len(), 1);
    }

    #[test]
    fn unsupported_statements_stay_opaque() {
        let module = parse_module("class A:\n    pass\n\ndef f():\n    with open('x') as fh:\n        return fh.read()\n").unwrap();
        assert!(module.body[0].is_class_definition());
        let def = module.function("f").unwrap();
        assert!(matches!(&def.body[0], Stmt::Opaque { kind, .. } if kind == "with_statement"));
    }

    #[test]
    fn chained_assignment_collects_targets() {
        let def = only_function("def f():\n    a = b = 1\n    return a + b\n");
        assert!(matches!(&def.body[0], Stmt::Assign { targets, .. } if targets.len() == 2));
    }
}
