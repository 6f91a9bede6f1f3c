//! Deterministic, precedence-aware Python printer
//!
//! Printing is canonical for the tree: formatting and comments of the input
//! are not preserved, and `parse(print(m))` prints identically to `m`.
//! Parentheses are emitted only where operator binding requires them.

use std::fmt::Write as _;

use crate::ast::{
    Alias, Arg, BoolOp, Comprehension, ComprehensionKind, Expr, FunctionDef, Module, Param,
    ParamKind, Stmt, StrLit, UnaryOp,
};

const INDENT: &str = "    ";

/// Print a module as Python source, terminated by a newline
#[must_use]
pub fn print_module(module: &Module) -> String {
    let mut printer = Printer::default();
    for (i, stmt) in module.body.iter().enumerate() {
        let is_definition = matches!(stmt, Stmt::FunctionDef(_)) || stmt.is_class_definition();
        let previous_definition = i > 0
            && (matches!(module.body[i - 1], Stmt::FunctionDef(_))
                || module.body[i - 1].is_class_definition());
        if i > 0 && (is_definition || previous_definition) {
            printer.out.push_str("\n\n");
        }
        printer.stmt(stmt);
    }
    printer.out
}

/// Print a single statement list at column zero
#[must_use]
pub fn print_body(body: &[Stmt]) -> String {
    let mut printer = Printer::default();
    printer.body(body);
    printer.out
}

/// Print an expression in a context that accepts any expression
#[must_use]
pub fn print_expr(expr: &Expr) -> String {
    expr_text(expr)
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn body(&mut self, body: &[Stmt]) {
        if body.is_empty() {
            self.line("pass");
            return;
        }
        for stmt in body {
            self.stmt(stmt);
        }
    }

    fn indented(&mut self, body: &[Stmt]) {
        self.depth += 1;
        self.body(body);
        self.depth -= 1;
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(def) => self.function(def),
            Stmt::Return(None) => self.line("return"),
            Stmt::Return(Some(value)) => self.line(&format!("return {}", expr_text(value))),
            Stmt::Assign {
                targets,
                value,
                annotation,
            } => {
                let mut text = String::new();
                for (i, target) in targets.iter().enumerate() {
                    text.push_str(&target_text(target));
                    if i == 0 && targets.len() == 1 {
                        if let Some(annotation) = annotation {
                            let _ = write!(text, ": {}", expr_text(annotation));
                        }
                    }
                    text.push_str(" = ");
                }
                text.push_str(&expr_text(value));
                self.line(&text);
            }
            Stmt::AugAssign { target, op, value } => self.line(&format!(
                "{} {}= {}",
                target_text(target),
                op.symbol(),
                expr_text(value)
            )),
            Stmt::Expr(expr) => self.line(&expr_text(expr)),
            Stmt::If { test, body, orelse } => {
                self.line(&format!("if {}:", expr_text(test)));
                self.indented(body);
                self.orelse(orelse);
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
            } => {
                self.line(&format!("for {} in {}:", target_text(target), expr_text(iter)));
                self.indented(body);
                if !orelse.is_empty() {
                    self.line("else:");
                    self.indented(orelse);
                }
            }
            Stmt::While { test, body, orelse } => {
                self.line(&format!("while {}:", expr_text(test)));
                self.indented(body);
                if !orelse.is_empty() {
                    self.line("else:");
                    self.indented(orelse);
                }
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.line("try:");
                self.indented(body);
                for handler in handlers {
                    let header = match (&handler.ty, &handler.name) {
                        (Some(ty), Some(name)) => format!("except {} as {name}:", expr_text(ty)),
                        (Some(ty), None) => format!("except {}:", expr_text(ty)),
                        (None, _) => "except:".to_string(),
                    };
                    self.line(&header);
                    self.indented(&handler.body);
                }
                if !orelse.is_empty() {
                    self.line("else:");
                    self.indented(orelse);
                }
                if !finalbody.is_empty() || handlers.is_empty() {
                    self.line("finally:");
                    self.indented(finalbody);
                }
            }
            Stmt::Raise { exc, cause } => {
                let text = match (exc, cause) {
                    (None, _) => "raise".to_string(),
                    (Some(exc), None) => format!("raise {}", expr_text(exc)),
                    (Some(exc), Some(cause)) => {
                        format!("raise {} from {}", expr_text(exc), expr_text(cause))
                    }
                };
                self.line(&text);
            }
            Stmt::Assert { test, msg } => match msg {
                Some(msg) => self.line(&format!("assert {}, {}", expr_text(test), expr_text(msg))),
                None => self.line(&format!("assert {}", expr_text(test))),
            },
            Stmt::Import(names) => self.line(&format!("import {}", aliases(names))),
            Stmt::ImportFrom { module, names } => {
                self.line(&format!("from {module} import {}", aliases(names)));
            }
            Stmt::Global(names) => self.line(&format!("global {}", names.join(", "))),
            Stmt::Nonlocal(names) => self.line(&format!("nonlocal {}", names.join(", "))),
            Stmt::Pass => self.line("pass"),
            Stmt::Break => self.line("break"),
            Stmt::Continue => self.line("continue"),
            Stmt::Opaque { text, .. } => {
                for line in text.lines() {
                    if line.trim().is_empty() {
                        self.out.push('\n');
                    } else {
                        self.line(line);
                    }
                }
            }
        }
    }

    fn orelse(&mut self, orelse: &[Stmt]) {
        match orelse {
            [] => {}
            [Stmt::If { test, body, orelse }] => {
                self.line(&format!("elif {}:", expr_text(test)));
                self.indented(body);
                self.orelse(orelse);
            }
            _ => {
                self.line("else:");
                self.indented(orelse);
            }
        }
    }

    fn function(&mut self, def: &FunctionDef) {
        for decorator in &def.decorators {
            self.line(&format!("@{}", expr_text(decorator)));
        }
        let mut header = String::new();
        if def.is_async {
            header.push_str("async ");
        }
        let _ = write!(header, "def {}({})", def.name, params_text(&def.params, true));
        if let Some(returns) = &def.returns {
            let _ = write!(header, " -> {}", expr_text(returns));
        }
        header.push(':');
        self.line(&header);
        self.indented(&def.body);
    }
}

fn aliases(names: &[Alias]) -> String {
    names
        .iter()
        .map(|alias| match &alias.asname {
            Some(asname) => format!("{} as {asname}", alias.name),
            None => alias.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn params_text(params: &[Param], annotated: bool) -> String {
    params
        .iter()
        .map(|param| {
            let mut text = match param.kind {
                ParamKind::Regular => param.name.clone(),
                ParamKind::VarArgs => format!("*{}", param.name),
                ParamKind::KwArgs => format!("**{}", param.name),
                ParamKind::KeywordOnlyMarker => return "*".to_string(),
                ParamKind::PositionalOnlyMarker => return "/".to_string(),
            };
            let annotation = param.annotation.as_ref().filter(|_| annotated);
            if let Some(annotation) = annotation {
                let _ = write!(text, ": {}", expr_text(annotation));
            }
            if let Some(default) = &param.default {
                let sep = if annotation.is_some() { " = " } else { "=" };
                let _ = write!(text, "{sep}{}", prec_text(default, 1));
            }
            text
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Binding strength of an expression, higher binds tighter
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Lambda { .. } => 1,
        Expr::IfExp { .. } => 2,
        Expr::BoolOp { op: BoolOp::Or, .. } => 3,
        Expr::BoolOp { op: BoolOp::And, .. } => 4,
        Expr::Unary { op: UnaryOp::Not, .. } => 5,
        Expr::Compare { .. } => 6,
        Expr::BinOp { op, .. } => op.precedence(),
        Expr::Unary { .. } => 13,
        Expr::Int(value) if *value < 0 => 13,
        Expr::Float(value) if *value < 0.0 => 13,
        Expr::Call { .. } | Expr::Attribute { .. } | Expr::Subscript { .. } => 16,
        Expr::Starred(_) | Expr::Slice { .. } => 1,
        Expr::Opaque(text) => {
            let starts_atomic =
                text.starts_with(|c: char| c == '\'' || c == '"' || c.is_ascii_alphabetic());
            let atomic =
                starts_atomic && !text.contains(char::is_whitespace) || looks_like_string(text);
            if atomic {
                17
            } else {
                0
            }
        }
        _ => 17,
    }
}

fn looks_like_string(text: &str) -> bool {
    let prefix_len = text
        .find(['\'', '"'])
        .unwrap_or(usize::MAX);
    prefix_len <= 3 && text[..prefix_len].chars().all(|c| c.is_ascii_alphabetic())
}

fn prec_text(expr: &Expr, min: u8) -> String {
    let text = expr_text(expr);
    if precedence(expr) < min {
        format!("({text})")
    } else {
        text
    }
}

fn target_text(target: &Expr) -> String {
    match target {
        Expr::Tuple(items) if !items.is_empty() => {
            let parts: Vec<String> = items.iter().map(target_text).collect();
            if parts.len() == 1 {
                format!("{},", parts[0])
            } else {
                parts.join(", ")
            }
        }
        Expr::List(items) => format!(
            "[{}]",
            items.iter().map(target_text).collect::<Vec<_>>().join(", ")
        ),
        Expr::Starred(inner) => format!("*{}", prec_text(inner, 16)),
        other => prec_text(other, 16),
    }
}

fn elements(items: &[Expr]) -> String {
    items
        .iter()
        .map(|item| prec_text(item, 1))
        .collect::<Vec<_>>()
        .join(", ")
}

fn float_text(value: f64) -> String {
    let text = format!("{value}");
    if text.contains(['.', 'e', 'E']) || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{text}.0")
    }
}

fn string_text(lit: &StrLit) -> String {
    let prefix = if lit.bytes { "b" } else { "" };
    let quote = if lit.value.contains('\'') && !lit.value.contains('"') {
        '"'
    } else {
        '\''
    };
    let trailing_backslashes = lit.value.chars().rev().take_while(|c| *c == '\\').count();
    let raw_ok = !lit.value.contains(quote)
        && !lit.value.contains(['\n', '\r'])
        && trailing_backslashes % 2 == 0;
    if lit.raw && raw_ok {
        return format!("{prefix}r{quote}{}{quote}", lit.value);
    }
    let mut out = String::with_capacity(lit.value.len() + 2);
    out.push_str(prefix);
    out.push(quote);
    for c in lit.value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn comprehension_text(comp: &Comprehension) -> String {
    let mut text = match comp.kind {
        ComprehensionKind::Dict => format!(
            "{}: {}",
            prec_text(&comp.element, 1),
            comp.value.as_ref().map_or_else(String::new, |v| prec_text(v, 1))
        ),
        _ => prec_text(&comp.element, 1),
    };
    for clause in &comp.clauses {
        let _ = write!(
            text,
            " for {} in {}",
            target_text(&clause.target),
            prec_text(&clause.iter, 3)
        );
        for cond in &clause.ifs {
            let _ = write!(text, " if {}", prec_text(cond, 3));
        }
    }
    match comp.kind {
        ComprehensionKind::List => format!("[{text}]"),
        ComprehensionKind::Set | ComprehensionKind::Dict => format!("{{{text}}}"),
        ComprehensionKind::Generator => format!("({text})"),
    }
}

fn args_text(args: &[Arg]) -> String {
    if let [Arg::Positional(Expr::Comprehension(comp))] = args {
        if comp.kind == ComprehensionKind::Generator {
            let text = comprehension_text(comp);
            return text[1..text.len() - 1].to_string();
        }
    }
    args.iter()
        .map(|arg| match arg {
            Arg::Positional(e) => prec_text(e, 1),
            Arg::Keyword { name, value } => format!("{name}={}", prec_text(value, 1)),
            Arg::Star(e) => format!("*{}", prec_text(e, 16)),
            Arg::DoubleStar(e) => format!("**{}", prec_text(e, 16)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn expr_text(expr: &Expr) -> String {
    match expr {
        Expr::Name(name) => name.clone(),
        Expr::Int(value) => value.to_string(),
        Expr::Float(value) => float_text(*value),
        Expr::Str(lit) => string_text(lit),
        Expr::Bool(true) => "True".to_string(),
        Expr::Bool(false) => "False".to_string(),
        Expr::NoneLit => "None".to_string(),
        Expr::BinOp { left, op, right } => {
            let p = op.precedence();
            let (left_min, right_min) = if op.symbol() == "**" {
                (15, 13)
            } else {
                (p, p + 1)
            };
            format!(
                "{} {} {}",
                prec_text(left, left_min),
                op.symbol(),
                prec_text(right, right_min)
            )
        }
        Expr::Unary { op: UnaryOp::Not, operand } => format!("not {}", prec_text(operand, 5)),
        Expr::Unary { op, operand } => format!("{}{}", op.symbol(), prec_text(operand, 13)),
        Expr::BoolOp { op, left, right } => {
            let p = match op {
                BoolOp::Or => 3,
                BoolOp::And => 4,
            };
            format!(
                "{} {} {}",
                prec_text(left, p),
                op.symbol(),
                prec_text(right, p + 1)
            )
        }
        Expr::Compare {
            left,
            ops,
            comparators,
        } => {
            let mut text = prec_text(left, 7);
            for (op, comparator) in ops.iter().zip(comparators) {
                let _ = write!(text, " {} {}", op.symbol(), prec_text(comparator, 7));
            }
            text
        }
        Expr::Call { func, args } => format!("{}({})", prec_text(func, 16), args_text(args)),
        Expr::Attribute { value, attr } => {
            let base = prec_text(value, 16);
            if matches!(**value, Expr::Int(_)) {
                format!("({base}).{attr}")
            } else {
                format!("{base}.{attr}")
            }
        }
        Expr::Subscript { value, index } => {
            let index_text = match &**index {
                Expr::Tuple(items) if !items.is_empty() => {
                    let parts = elements(items);
                    if items.len() == 1 {
                        format!("{parts},")
                    } else {
                        parts
                    }
                }
                other => prec_text(other, 1),
            };
            format!("{}[{index_text}]", prec_text(value, 16))
        }
        Expr::Slice { lower, upper, step } => {
            let part = |p: &Option<Box<Expr>>| {
                p.as_ref().map_or_else(String::new, |e| prec_text(e, 2))
            };
            match step {
                Some(_) => format!("{}:{}:{}", part(lower), part(upper), part(step)),
                None => format!("{}:{}", part(lower), part(upper)),
            }
        }
        Expr::List(items) => format!("[{}]", elements(items)),
        Expr::Tuple(items) => match items.len() {
            0 => "()".to_string(),
            1 => format!("({},)", prec_text(&items[0], 1)),
            _ => format!("({})", elements(items)),
        },
        Expr::Set(items) if items.is_empty() => "set()".to_string(),
        Expr::Set(items) => format!("{{{}}}", elements(items)),
        Expr::Dict(pairs) => format!(
            "{{{}}}",
            pairs
                .iter()
                .map(|(k, v)| format!("{}: {}", prec_text(k, 1), prec_text(v, 1)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Expr::Comprehension(comp) => comprehension_text(comp),
        Expr::IfExp { test, body, orelse } => format!(
            "{} if {} else {}",
            prec_text(body, 3),
            prec_text(test, 3),
            prec_text(orelse, 2)
        ),
        Expr::Lambda { params, body } => {
            if params.is_empty() {
                format!("lambda: {}", prec_text(body, 1))
            } else {
                format!("lambda {}: {}", params_text(params, false), prec_text(body, 1))
            }
        }
        Expr::Starred(inner) => format!("*{}", prec_text(inner, 16)),
        Expr::Opaque(text) => text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;
    use crate::parser::parse_module;
    use pretty_assertions::assert_eq;

    fn reprint(source: &str) -> String {
        print_module(&parse_module(source).unwrap())
    }

    #[test]
    fn prints_canonical_layout() {
        assert_eq!(
            reprint("def f(n):\n    r = n*2\n    return r"),
            "def f(n):\n    r = n * 2\n    return r\n"
        );
    }

    #[test]
    fn keeps_required_parentheses_only() {
        assert_eq!(
            reprint("def f(a, b, c):\n    return ((a + b)) * (c)\n"),
            "def f(a, b, c):\n    return (a + b) * c\n"
        );
        assert_eq!(
            reprint("def f(a, b, c):\n    return a - (b - c)\n"),
            "def f(a, b, c):\n    return a - (b - c)\n"
        );
        assert_eq!(
            reprint("def f(x):\n    return (-x) ** 2 + -x ** 2\n"),
            "def f(x):\n    return (-x) ** 2 + -x ** 2\n"
        );
    }

    #[test]
    fn not_and_comparisons() {
        assert_eq!(
            reprint("def f(x, y):\n    return not (x == y) and (x or y)\n"),
            "def f(x, y):\n    return not x == y and (x or y)\n"
        );
    }

    #[test]
    fn printing_is_a_fixed_point() {
        let sources = [
            "def f(xs):\n    out = []\n    for x in xs:\n        if x % 2 == 0:\n            out.append(x * x)\n    return out\n",
            "def g(s):\n    return ''.join(c for c in s if c.isalpha())\n",
            "def h(d, k=None, *args, **kw):\n    try:\n        return d[k]\n    except KeyError as e:\n        raise ValueError('missing') from e\n    finally:\n        pass\n",
            "def p(x):\n    return x if x > 0 else (lambda y: -y)(x)\n",
            "def q(items):\n    total, count = 0, 0\n    for i, v in enumerate(items[1:-1:2]):\n        total += v\n    return {k: v for k, v in items}, (total,)\n",
            "import re\n\n\ndef r(s):\n    return re.match(r'^[a-z]+\\d*$', s) is not None\n",
        ];
        for source in sources {
            let once = reprint(source);
            assert_eq!(reprint(&once), once);
        }
    }

    #[test]
    fn string_quoting() {
        assert_eq!(string_text(&StrLit::plain("it's")), "\"it's\"");
        assert_eq!(string_text(&StrLit::plain("a\nb")), "'a\\nb'");
        let raw = StrLit {
            value: r"\d+".to_string(),
            raw: true,
            bytes: false,
        };
        assert_eq!(string_text(&raw), r"r'\d+'");
    }

    #[test]
    fn float_and_negative_literals() {
        assert_eq!(float_text(1.0), "1.0");
        assert_eq!(float_text(2.5), "2.5");
        let expr = Expr::binop(Expr::Int(-3), BinOp::Pow, Expr::Int(2));
        assert_eq!(print_expr(&expr), "(-3) ** 2");
    }

    #[test]
    fn empty_body_prints_pass() {
        let module = Module::new(vec![Stmt::If {
            test: Expr::name("x"),
            body: Vec::new(),
            orelse: Vec::new(),
        }]);
        assert_eq!(print_module(&module), "if x:\n    pass\n");
    }
}
