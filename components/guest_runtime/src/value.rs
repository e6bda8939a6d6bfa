//! Guest value representation.
//!
//! Primitives are stored inline. Functions, tables and userdata are shared
//! references owned by the runtime; cloning a [`GuestValue`] clones the
//! reference, never the referent.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::GuestResult;
use crate::state::GuestState;
use crate::table::Table;

/// Signature of a native guest closure
///
/// Receives the running state and the call arguments, returns any number of
/// results.
pub type NativeClosure = dyn Fn(&GuestState, Vec<GuestValue>) -> GuestResult<Vec<GuestValue>>;

struct FunctionInner {
    name: String,
    body: Box<NativeClosure>,
}

/// A guest closure reference
#[derive(Clone)]
pub struct GuestFunction(Rc<FunctionInner>);

impl GuestFunction {
    /// Create a named closure
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&GuestState, Vec<GuestValue>) -> GuestResult<Vec<GuestValue>> + 'static,
    {
        GuestFunction(Rc::new(FunctionInner {
            name: name.into(),
            body: Box::new(body),
        }))
    }

    /// Debug name given at creation
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Run the closure body directly, bypassing the call-depth guard
    pub(crate) fn invoke(&self, state: &GuestState, args: Vec<GuestValue>) -> GuestResult<Vec<GuestValue>> {
        (self.0.body)(state, args)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &GuestFunction) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of strong references to this closure
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for GuestFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuestFunction({})", self.0.name)
    }
}

struct UserDataInner {
    payload: Box<dyn Any>,
    metatable: RefCell<Option<Table>>,
}

/// A full userdata: an opaque payload plus an optional metatable
#[derive(Clone)]
pub struct UserData(Rc<UserDataInner>);

impl UserData {
    /// Wrap a payload with no metatable
    pub fn new<T: Any>(payload: T) -> Self {
        UserData(Rc::new(UserDataInner {
            payload: Box::new(payload),
            metatable: RefCell::new(None),
        }))
    }

    /// Borrow the payload if it is of type `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.payload.downcast_ref::<T>()
    }

    /// Whether the payload is of type `T`
    pub fn is<T: Any>(&self) -> bool {
        self.0.payload.is::<T>()
    }

    /// Current metatable
    pub fn metatable(&self) -> Option<Table> {
        self.0.metatable.borrow().clone()
    }

    /// Replace the metatable
    pub fn set_metatable(&self, metatable: Option<Table>) {
        *self.0.metatable.borrow_mut() = metatable;
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &UserData) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserData({:#x})", self.addr())
    }
}

/// The runtime kind of a guest value (`type(v)`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuestKind {
    /// nil
    Nil,
    /// boolean
    Boolean,
    /// number
    Number,
    /// string
    String,
    /// function
    Function,
    /// table
    Table,
    /// userdata
    UserData,
}

impl GuestKind {
    /// Name as reported by `type(v)`
    pub fn name(self) -> &'static str {
        match self {
            GuestKind::Nil => "nil",
            GuestKind::Boolean => "boolean",
            GuestKind::Number => "number",
            GuestKind::String => "string",
            GuestKind::Function => "function",
            GuestKind::Table => "table",
            GuestKind::UserData => "userdata",
        }
    }
}

/// Any guest value
///
/// # Examples
///
/// ```
/// use guest_runtime::{GuestKind, GuestValue};
///
/// let v = GuestValue::from(3.0);
/// assert_eq!(v.kind(), GuestKind::Number);
/// assert_eq!(v.type_name(), "number");
/// assert!(GuestValue::Nil.is_nil());
/// ```
#[derive(Clone, Default)]
pub enum GuestValue {
    /// nil
    #[default]
    Nil,
    /// true or false
    Boolean(bool),
    /// The single numeric kind
    Number(f64),
    /// Immutable string
    String(String),
    /// Closure reference
    Function(GuestFunction),
    /// Table reference
    Table(Table),
    /// Userdata reference
    UserData(UserData),
}

impl GuestValue {
    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        GuestValue::String(s.into())
    }

    /// Create a function value from a native closure
    pub fn function<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&GuestState, Vec<GuestValue>) -> GuestResult<Vec<GuestValue>> + 'static,
    {
        GuestValue::Function(GuestFunction::new(name, body))
    }

    /// Create a userdata value wrapping `payload`
    pub fn userdata<T: Any>(payload: T) -> Self {
        GuestValue::UserData(UserData::new(payload))
    }

    /// Runtime kind
    pub fn kind(&self) -> GuestKind {
        match self {
            GuestValue::Nil => GuestKind::Nil,
            GuestValue::Boolean(_) => GuestKind::Boolean,
            GuestValue::Number(_) => GuestKind::Number,
            GuestValue::String(_) => GuestKind::String,
            GuestValue::Function(_) => GuestKind::Function,
            GuestValue::Table(_) => GuestKind::Table,
            GuestValue::UserData(_) => GuestKind::UserData,
        }
    }

    /// `type(v)`
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Check if value is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, GuestValue::Nil)
    }

    /// Get as boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            GuestValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            GuestValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GuestValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as table
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            GuestValue::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Get as function
    pub fn as_function(&self) -> Option<&GuestFunction> {
        match self {
            GuestValue::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Get as userdata
    pub fn as_userdata(&self) -> Option<&UserData> {
        match self {
            GuestValue::UserData(u) => Some(u),
            _ => None,
        }
    }

    /// Address of a reference value, `None` for primitives
    pub fn ref_addr(&self) -> Option<usize> {
        match self {
            GuestValue::Function(f) => Some(f.addr()),
            GuestValue::Table(t) => Some(t.addr()),
            GuestValue::UserData(u) => Some(u.addr()),
            _ => None,
        }
    }

    /// Raw equality: primitives by value, references by identity
    pub fn raw_equals(&self, other: &GuestValue) -> bool {
        match (self, other) {
            (GuestValue::Nil, GuestValue::Nil) => true,
            (GuestValue::Boolean(a), GuestValue::Boolean(b)) => a == b,
            (GuestValue::Number(a), GuestValue::Number(b)) => a == b,
            (GuestValue::String(a), GuestValue::String(b)) => a == b,
            (GuestValue::Function(a), GuestValue::Function(b)) => a.ptr_eq(b),
            (GuestValue::Table(a), GuestValue::Table(b)) => a.ptr_eq(b),
            (GuestValue::UserData(a), GuestValue::UserData(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Format a number the way `tostring` does for the single numeric kind
///
/// Integral values below 1e15 print without a fraction; everything else
/// uses 14 significant digits in `%.14g` style.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "inf" } else { "-inf" };
        s.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format_general(n)
    }
}

fn format_general(n: f64) -> String {
    let sci = format!("{:.13e}", n);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if !(-4..14).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (13 - exp) as usize;
        trim_fraction(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

impl fmt::Debug for GuestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestValue::Nil => write!(f, "Nil"),
            GuestValue::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            GuestValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            GuestValue::String(s) => f.debug_tuple("String").field(s).finish(),
            GuestValue::Function(func) => write!(f, "{:?}", func),
            GuestValue::Table(t) => write!(f, "Table({:#x})", t.addr()),
            GuestValue::UserData(u) => write!(f, "{:?}", u),
        }
    }
}

/// Default `tostring` conversion, ignoring `__tostring`
impl fmt::Display for GuestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestValue::Nil => write!(f, "nil"),
            GuestValue::Boolean(b) => write!(f, "{}", b),
            GuestValue::Number(n) => f.write_str(&format_number(*n)),
            GuestValue::String(s) => f.write_str(s),
            GuestValue::Function(func) => write!(f, "function: {:#x}", func.addr()),
            GuestValue::Table(t) => write!(f, "table: {:#x}", t.addr()),
            GuestValue::UserData(u) => write!(f, "userdata: {:#x}", u.addr()),
        }
    }
}

impl PartialEq for GuestValue {
    fn eq(&self, other: &Self) -> bool {
        self.raw_equals(other)
    }
}

impl From<bool> for GuestValue {
    fn from(v: bool) -> Self {
        GuestValue::Boolean(v)
    }
}

impl From<f64> for GuestValue {
    fn from(v: f64) -> Self {
        GuestValue::Number(v)
    }
}

impl From<i32> for GuestValue {
    fn from(v: i32) -> Self {
        GuestValue::Number(v as f64)
    }
}

impl From<&str> for GuestValue {
    fn from(v: &str) -> Self {
        GuestValue::String(v.to_string())
    }
}

impl From<String> for GuestValue {
    fn from(v: String) -> Self {
        GuestValue::String(v)
    }
}

impl From<Table> for GuestValue {
    fn from(v: Table) -> Self {
        GuestValue::Table(v)
    }
}

impl From<GuestFunction> for GuestValue {
    fn from(v: GuestFunction) -> Self {
        GuestValue::Function(v)
    }
}

impl From<UserData> for GuestValue {
    fn from(v: UserData) -> Self {
        GuestValue::UserData(v)
    }
}
