//! スクリプト値とコールバック関数

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::{Rc, Weak};

/// ネイティブ関数の本体
type NativeFn = dyn Fn(&[Value]) -> Result<Vec<Value>>;

/// 関数の同一性を表すID（Rcのアドレス）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(usize);

/// スクリプトから呼び出せる関数
///
/// クローンは同じ関数を指します。等価性は同一性（ポインタ）で判定します。
#[derive(Clone)]
pub struct Function {
    inner: Rc<NativeFn>,
}

impl Function {
    /// クロージャから関数を作成する
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Vec<Value>> + 'static,
    {
        Self { inner: Rc::new(f) }
    }

    /// 関数を呼び出す
    pub fn call(&self, args: &[Value]) -> Result<Vec<Value>> {
        (self.inner)(args)
    }

    /// 関数の同一性IDを取得する
    pub fn id(&self) -> FunctionId {
        FunctionId(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    /// 同じ関数かどうか
    pub fn ptr_eq(&self, other: &Function) -> bool {
        self.id() == other.id()
    }

    /// 弱参照を作成する
    pub fn downgrade(&self) -> WeakFunction {
        WeakFunction {
            id: self.id(),
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// この関数を保持している強参照の数
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function: 0x{:x}", self.id().0)
    }
}

/// 関数への弱参照
///
/// 関数の生存期間を延ばしません。
#[derive(Clone)]
pub struct WeakFunction {
    id: FunctionId,
    inner: Weak<NativeFn>,
}

impl WeakFunction {
    /// 強参照に戻す（関数が解放済みなら None）
    pub fn upgrade(&self) -> Option<Function> {
        self.inner.upgrade().map(|inner| Function { inner })
    }

    /// 関数がまだ生きているか
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// 作成元の関数のID
    pub fn id(&self) -> FunctionId {
        self.id
    }
}

impl fmt::Debug for WeakFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "weak function: 0x{:x} (alive: {})", self.id.0, self.is_alive())
    }
}

/// ローカライズ可能な文字列（`["key", params...]` 形式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct LocalisedString {
    pub key: String,
    pub params: Vec<String>,
}

impl LocalisedString {
    pub fn new(key: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            key: key.into(),
            params,
        }
    }
}

impl From<LocalisedString> for Vec<String> {
    fn from(value: LocalisedString) -> Self {
        let mut parts = Vec::with_capacity(value.params.len() + 1);
        parts.push(value.key);
        parts.extend(value.params);
        parts
    }
}

impl TryFrom<Vec<String>> for LocalisedString {
    type Error = String;

    fn try_from(mut parts: Vec<String>) -> std::result::Result<Self, Self::Error> {
        if parts.is_empty() {
            return Err("localised string needs a key".to_string());
        }
        let key = parts.remove(0);
        Ok(Self { key, params: parts })
    }
}

impl fmt::Display for LocalisedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        if !self.params.is_empty() {
            write!(f, " [{}]", self.params.join(", "))?;
        }
        Ok(())
    }
}

/// スクリプト値
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Str(String),
    Localised(LocalisedString),
    Function(Function),
}

impl Value {
    /// 真偽値として評価する（nil と false 以外は真）
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// 型名を取得する
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Integer(_) | Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Localised(_) => "LocalisedString",
            Value::Function(_) => "function",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Localised(l) => write!(f, "{}", l),
            Value::Function(func) => write!(f, "{:?}", func),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<LocalisedString> for Value {
    fn from(l: LocalisedString) -> Self {
        Value::Localised(l)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}
