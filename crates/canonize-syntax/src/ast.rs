//! Owned syntax tree for the Python subset the engine rewrites
//!
//! The tree is closed: every construct the lowering does not model is kept
//! verbatim as an `Opaque` node so that printing never loses code. Names are
//! plain strings; scoping is computed on demand by [`crate::scope`] and
//! [`crate::normalize`].

/// A parsed source fragment
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    /// Top-level statements in source order
    pub body: Vec<Stmt>,
}

impl Module {
    /// Create a module from statements
    #[inline]
    #[must_use]
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }

    /// Top-level function definitions in source order
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.iter().filter_map(|stmt| match stmt {
            Stmt::FunctionDef(def) => Some(def),
            _ => None,
        })
    }

    /// Look up a top-level function by name
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions().find(|def| def.name == name)
    }

    /// Mutable lookup of a top-level function by name
    pub fn function_mut(&mut self, name: &str) -> Option<&mut FunctionDef> {
        self.body.iter_mut().find_map(|stmt| match stmt {
            Stmt::FunctionDef(def) if def.name == name => Some(def),
            _ => None,
        })
    }

    /// First top-level function, the default entry point
    #[must_use]
    pub fn primary_function(&self) -> Option<&FunctionDef> {
        self.functions().next()
    }

    /// Whether at least one top-level definition exists
    #[must_use]
    pub fn has_definition(&self) -> bool {
        self.body
            .iter()
            .any(|stmt| matches!(stmt, Stmt::FunctionDef(_)) || stmt.is_class_definition())
    }
}

/// Function definition
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// Function name
    pub name: String,
    /// Parameters in declaration order
    pub params: Vec<Param>,
    /// Body statements
    pub body: Vec<Stmt>,
    /// Decorator expressions, outermost first
    pub decorators: Vec<Expr>,
    /// Return annotation
    pub returns: Option<Expr>,
    /// Declared with `async def`
    pub is_async: bool,
}

impl FunctionDef {
    /// Leading string-literal statement, if any
    #[must_use]
    pub fn docstring(&self) -> Option<&str> {
        match self.body.first() {
            Some(Stmt::Expr(Expr::Str(lit))) => Some(&lit.value),
            _ => None,
        }
    }

    /// Names of ordinary and variadic parameters, skipping separators
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| !p.kind.is_separator())
            .map(|p| p.name.as_str())
    }

    /// Number of parameters without defaults that callers must supply
    #[must_use]
    pub fn required_arity(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::Regular && p.default.is_none())
            .count()
    }
}

/// Function or lambda parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Bound name (empty for separators)
    pub name: String,
    /// Parameter flavour
    pub kind: ParamKind,
    /// Default value
    pub default: Option<Expr>,
    /// Type annotation
    pub annotation: Option<Expr>,
}

impl Param {
    /// Plain positional parameter
    #[must_use]
    pub fn regular(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Regular,
            default: None,
            annotation: None,
        }
    }
}

/// Parameter flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// `x` or `x=1`
    Regular,
    /// `*args`
    VarArgs,
    /// `**kwargs`
    KwArgs,
    /// Bare `*`
    KeywordOnlyMarker,
    /// Bare `/`
    PositionalOnlyMarker,
}

impl ParamKind {
    /// Separators bind no name
    #[inline]
    #[must_use]
    pub const fn is_separator(self) -> bool {
        matches!(self, Self::KeywordOnlyMarker | Self::PositionalOnlyMarker)
    }
}

/// `except` clause of a `try` statement
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptHandler {
    /// Exception type expression
    pub ty: Option<Expr>,
    /// `as` binding
    pub name: Option<String>,
    /// Handler body
    pub body: Vec<Stmt>,
}

/// Imported name with optional alias
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    /// Dotted module or member name
    pub name: String,
    /// `as` alias
    pub asname: Option<String>,
}

impl Alias {
    /// Name this import binds in the enclosing scope
    #[must_use]
    pub fn bound_name(&self) -> &str {
        match &self.asname {
            Some(alias) => alias,
            None => self.name.split('.').next().unwrap_or(&self.name),
        }
    }
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `def`
    FunctionDef(FunctionDef),
    /// `return [value]`
    Return(Option<Expr>),
    /// `a = b = value`, optionally annotated
    Assign {
        /// Targets, left to right
        targets: Vec<Expr>,
        /// Assigned value
        value: Expr,
        /// Annotation of a single annotated target
        annotation: Option<Expr>,
    },
    /// `target op= value`
    AugAssign {
        /// Target
        target: Expr,
        /// Operator
        op: BinOp,
        /// Right-hand side
        value: Expr,
    },
    /// Expression statement
    Expr(Expr),
    /// `if` with `elif` chains folded into `orelse`
    If {
        /// Condition
        test: Expr,
        /// Then branch
        body: Vec<Stmt>,
        /// Else branch
        orelse: Vec<Stmt>,
    },
    /// `for target in iter`
    For {
        /// Loop target
        target: Expr,
        /// Iterable
        iter: Expr,
        /// Loop body
        body: Vec<Stmt>,
        /// `else` clause
        orelse: Vec<Stmt>,
    },
    /// `while test`
    While {
        /// Condition
        test: Expr,
        /// Loop body
        body: Vec<Stmt>,
        /// `else` clause
        orelse: Vec<Stmt>,
    },
    /// `try` statement
    Try {
        /// Protected body
        body: Vec<Stmt>,
        /// `except` clauses
        handlers: Vec<ExceptHandler>,
        /// `else` clause
        orelse: Vec<Stmt>,
        /// `finally` clause
        finalbody: Vec<Stmt>,
    },
    /// `raise [exc [from cause]]`
    Raise {
        /// Raised exception
        exc: Option<Expr>,
        /// Chained cause
        cause: Option<Expr>,
    },
    /// `assert test[, msg]`
    Assert {
        /// Asserted condition
        test: Expr,
        /// Failure message
        msg: Option<Expr>,
    },
    /// `import a, b as c`
    Import(Vec<Alias>),
    /// `from module import a, b as c`
    ImportFrom {
        /// Module path, including leading dots
        module: String,
        /// Imported members
        names: Vec<Alias>,
    },
    /// `global a, b`
    Global(Vec<String>),
    /// `nonlocal a, b`
    Nonlocal(Vec<String>),
    /// `pass`
    Pass,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// Construct kept verbatim
    Opaque {
        /// tree-sitter node kind
        kind: String,
        /// Source text, dedented to column zero
        text: String,
        /// Names the construct binds in its scope
        binds: Vec<String>,
    },
}

impl Stmt {
    /// Expression statement wrapping a call to `name`
    #[must_use]
    pub fn is_call_to(&self, name: &str) -> bool {
        matches!(self, Stmt::Expr(Expr::Call { func, .. }) if func.is_name(name))
    }

    /// Opaque `class` definition
    #[must_use]
    pub fn is_class_definition(&self) -> bool {
        matches!(self, Stmt::Opaque { kind, .. } if kind == "class_definition")
    }

    /// Statement always leaves the enclosing block
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Stmt::Return(_) | Stmt::Raise { .. } | Stmt::Break | Stmt::Continue
        )
    }

    /// Short kind token used by ordering and reporting
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::FunctionDef(_) => "def",
            Stmt::Return(_) => "return",
            Stmt::Assign { .. } => "assign",
            Stmt::AugAssign { .. } => "augassign",
            Stmt::Expr(_) => "expr",
            Stmt::If { .. } => "if",
            Stmt::For { .. } => "for",
            Stmt::While { .. } => "while",
            Stmt::Try { .. } => "try",
            Stmt::Raise { .. } => "raise",
            Stmt::Assert { .. } => "assert",
            Stmt::Import(_) | Stmt::ImportFrom { .. } => "import",
            Stmt::Global(_) => "global",
            Stmt::Nonlocal(_) => "nonlocal",
            Stmt::Pass => "pass",
            Stmt::Break => "break",
            Stmt::Continue => "continue",
            Stmt::Opaque { .. } => "opaque",
        }
    }
}

/// String literal
#[derive(Debug, Clone, PartialEq)]
pub struct StrLit {
    /// Decoded value
    pub value: String,
    /// Written with an `r` prefix
    pub raw: bool,
    /// Written with a `b` prefix
    pub bytes: bool,
}

impl StrLit {
    /// Plain (non-raw, text) literal
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            raw: false,
            bytes: false,
        }
    }
}

/// Call argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Positional
    Positional(Expr),
    /// `name=value`
    Keyword {
        /// Keyword
        name: String,
        /// Value
        value: Expr,
    },
    /// `*expr`
    Star(Expr),
    /// `**expr`
    DoubleStar(Expr),
}

impl Arg {
    /// Wrapped expression
    #[must_use]
    pub fn value(&self) -> &Expr {
        match self {
            Arg::Positional(e) | Arg::Star(e) | Arg::DoubleStar(e) => e,
            Arg::Keyword { value, .. } => value,
        }
    }

    /// Mutable wrapped expression
    pub fn value_mut(&mut self) -> &mut Expr {
        match self {
            Arg::Positional(e) | Arg::Star(e) | Arg::DoubleStar(e) => e,
            Arg::Keyword { value, .. } => value,
        }
    }
}

/// Comprehension flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionKind {
    /// `[e for ...]`
    List,
    /// `{e for ...}`
    Set,
    /// `{k: v for ...}`
    Dict,
    /// `(e for ...)`
    Generator,
}

/// One `for ... in ... [if ...]` clause
#[derive(Debug, Clone, PartialEq)]
pub struct ComprehensionClause {
    /// Loop target
    pub target: Expr,
    /// Iterable
    pub iter: Expr,
    /// Filters attached to this clause
    pub ifs: Vec<Expr>,
}

/// Comprehension body and clauses
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    /// Flavour
    pub kind: ComprehensionKind,
    /// Element (key for dict comprehensions)
    pub element: Expr,
    /// Value for dict comprehensions
    pub value: Option<Expr>,
    /// Clauses, outermost first
    pub clauses: Vec<ComprehensionClause>,
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Identifier
    Name(String),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal
    Str(StrLit),
    /// `True` / `False`
    Bool(bool),
    /// `None`
    NoneLit,
    /// Binary arithmetic or bitwise operation
    BinOp {
        /// Left operand
        left: Box<Expr>,
        /// Operator
        op: BinOp,
        /// Right operand
        right: Box<Expr>,
    },
    /// Unary operation including `not`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// `and` / `or`
    BoolOp {
        /// Operator
        op: BoolOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Comparison chain `left op0 c0 op1 c1 ...`
    Compare {
        /// First operand
        left: Box<Expr>,
        /// Operators
        ops: Vec<CmpOp>,
        /// Remaining operands
        comparators: Vec<Expr>,
    },
    /// Call
    Call {
        /// Callee
        func: Box<Expr>,
        /// Arguments
        args: Vec<Arg>,
    },
    /// `value.attr`
    Attribute {
        /// Object
        value: Box<Expr>,
        /// Attribute name
        attr: String,
    },
    /// `value[index]`
    Subscript {
        /// Container
        value: Box<Expr>,
        /// Index or slice
        index: Box<Expr>,
    },
    /// `lower:upper:step`
    Slice {
        /// Lower bound
        lower: Option<Box<Expr>>,
        /// Upper bound
        upper: Option<Box<Expr>>,
        /// Step
        step: Option<Box<Expr>>,
    },
    /// List display
    List(Vec<Expr>),
    /// Tuple display
    Tuple(Vec<Expr>),
    /// Set display
    Set(Vec<Expr>),
    /// Dict display
    Dict(Vec<(Expr, Expr)>),
    /// Comprehension of any flavour
    Comprehension(Box<Comprehension>),
    /// `body if test else orelse`
    IfExp {
        /// Condition
        test: Box<Expr>,
        /// Value when true
        body: Box<Expr>,
        /// Value when false
        orelse: Box<Expr>,
    },
    /// `lambda params: body`
    Lambda {
        /// Parameters
        params: Vec<Param>,
        /// Body expression
        body: Box<Expr>,
    },
    /// `*value` in targets and displays
    Starred(Box<Expr>),
    /// Construct kept verbatim
    Opaque(String),
}

impl Expr {
    /// Identifier expression
    #[inline]
    #[must_use]
    pub fn name(id: impl Into<String>) -> Self {
        Self::Name(id.into())
    }

    /// Call `func(args...)` with positional arguments
    #[must_use]
    pub fn call(func: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Call {
            func: Box::new(Self::name(func)),
            args: args.into_iter().map(Arg::Positional).collect(),
        }
    }

    /// Binary operation
    #[must_use]
    pub fn binop(left: Expr, op: BinOp, right: Expr) -> Self {
        Self::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// `not operand`
    #[must_use]
    pub fn not(operand: Expr) -> Self {
        Self::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    /// Single comparison
    #[must_use]
    pub fn compare(left: Expr, op: CmpOp, right: Expr) -> Self {
        Self::Compare {
            left: Box::new(left),
            ops: vec![op],
            comparators: vec![right],
        }
    }

    /// Whether this is the identifier `id`
    #[inline]
    #[must_use]
    pub fn is_name(&self, id: &str) -> bool {
        matches!(self, Expr::Name(n) if n == id)
    }

    /// Identifier text when this is a name
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Callee name and positional arguments of a simple call
    #[must_use]
    pub fn as_simple_call(&self) -> Option<(&str, Vec<&Expr>)> {
        let Expr::Call { func, args } = self else {
            return None;
        };
        let name = func.as_name()?;
        let mut positional = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Positional(e) => positional.push(e),
                _ => return None,
            }
        }
        Some((name, positional))
    }

    /// Literal constant
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) | Expr::NoneLit
        )
    }

    /// Contains no call, so evaluating it twice is unobservable
    #[must_use]
    pub fn is_call_free(&self) -> bool {
        let mut finder = crate::visit::CallFinder::default();
        crate::visit::Visitor::visit_expr(&mut finder, self);
        !finder.found
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `@`
    MatMul,
    /// `<<`
    LShift,
    /// `>>`
    RShift,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,
}

impl BinOp {
    /// Every operator
    pub const ALL: [BinOp; 13] = [
        BinOp::Add,
        BinOp::Sub,
        BinOp::Mul,
        BinOp::Div,
        BinOp::FloorDiv,
        BinOp::Mod,
        BinOp::Pow,
        BinOp::MatMul,
        BinOp::LShift,
        BinOp::RShift,
        BinOp::BitOr,
        BinOp::BitXor,
        BinOp::BitAnd,
    ];

    /// Source symbol
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::MatMul => "@",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
        }
    }

    /// Parse a source symbol
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// Binding strength, higher binds tighter
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            BinOp::BitOr => 7,
            BinOp::BitXor => 8,
            BinOp::BitAnd => 9,
            BinOp::LShift | BinOp::RShift => 10,
            BinOp::Add | BinOp::Sub => 11,
            BinOp::Mul | BinOp::Div | BinOp::FloorDiv | BinOp::Mod | BinOp::MatMul => 12,
            BinOp::Pow => 14,
        }
    }

    /// Operand order is irrelevant for numbers
    #[must_use]
    pub const fn is_commutative(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Mul | BinOp::BitOr | BinOp::BitXor | BinOp::BitAnd
        )
    }

    /// Grouping is irrelevant for numbers
    #[must_use]
    pub const fn is_associative(self) -> bool {
        self.is_commutative()
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `+`
    Pos,
    /// `~`
    Invert,
    /// `not`
    Not,
}

impl UnaryOp {
    /// Source symbol
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Invert => "~",
            UnaryOp::Not => "not",
        }
    }
}

/// Boolean operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoolOp {
    /// `and`
    And,
    /// `or`
    Or,
}

impl BoolOp {
    /// Source keyword
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtE,
    /// `>`
    Gt,
    /// `>=`
    GtE,
    /// `is`
    Is,
    /// `is not`
    IsNot,
    /// `in`
    In,
    /// `not in`
    NotIn,
}

impl CmpOp {
    /// Source symbol
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }

    /// Parse a source symbol
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => CmpOp::Eq,
            "!=" | "<>" => CmpOp::NotEq,
            "<" => CmpOp::Lt,
            "<=" => CmpOp::LtE,
            ">" => CmpOp::Gt,
            ">=" => CmpOp::GtE,
            "is" => CmpOp::Is,
            "is not" => CmpOp::IsNot,
            "in" => CmpOp::In,
            "not in" => CmpOp::NotIn,
            _ => return None,
        })
    }

    /// Logical complement, `not (a op b)` == `a op' b`
    #[must_use]
    pub const fn negated(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::NotEq,
            CmpOp::NotEq => CmpOp::Eq,
            CmpOp::Lt => CmpOp::GtE,
            CmpOp::LtE => CmpOp::Gt,
            CmpOp::Gt => CmpOp::LtE,
            CmpOp::GtE => CmpOp::Lt,
            CmpOp::Is => CmpOp::IsNot,
            CmpOp::IsNot => CmpOp::Is,
            CmpOp::In => CmpOp::NotIn,
            CmpOp::NotIn => CmpOp::In,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binop_symbols_round_trip() {
        for op in BinOp::ALL {
            assert_eq!(BinOp::from_symbol(op.symbol()), Some(op));
        }
    }

    #[test]
    fn cmp_negation_is_involutive() {
        for op in [CmpOp::Eq, CmpOp::Lt, CmpOp::GtE, CmpOp::In, CmpOp::Is] {
            assert_eq!(op.negated().negated(), op);
        }
    }

    #[test]
    fn required_arity_skips_defaults_and_variadics() {
        let def = FunctionDef {
            name: "f".into(),
            params: vec![
                Param::regular("a"),
                Param {
                    default: Some(Expr::Int(1)),
                    ..Param::regular("b")
                },
                Param {
                    kind: ParamKind::VarArgs,
                    ..Param::regular("rest")
                },
            ],
            body: vec![Stmt::Pass],
            decorators: Vec::new(),
            returns: None,
            is_async: false,
        };
        assert_eq!(def.required_arity(), 1);
        assert_eq!(def.param_names().collect::<Vec<_>>(), vec!["a", "b", "rest"]);
    }

    #[test]
    fn simple_call_rejects_keywords() {
        let call = Expr::Call {
            func: Box::new(Expr::name("sorted")),
            args: vec![
                Arg::Positional(Expr::name("xs")),
                Arg::Keyword {
                    name: "reverse".into(),
                    value: Expr::Bool(true),
                },
            ],
        };
        assert!(call.as_simple_call().is_none());
        let plain = Expr::call("len", vec![Expr::name("xs")]);
        assert_eq!(plain.as_simple_call().map(|(n, a)| (n, a.len())), Some(("len", 1)));
    }

    #[test]
    fn alias_binds_first_segment() {
        let plain = Alias {
            name: "os.path".into(),
            asname: None,
        };
        assert_eq!(plain.bound_name(), "os");
        let aliased = Alias {
            name: "os.path".into(),
            asname: Some("p".into()),
        };
        assert_eq!(aliased.bound_name(), "p");
    }
}
