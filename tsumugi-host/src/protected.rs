//! 保護呼び出し（pcall / xpcall）

use crate::{Function, HostError, Value};

/// 保護呼び出しの結果（状態フラグと値）
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectedResult {
    pub ok: bool,
    pub values: Vec<Value>,
}

impl ProtectedResult {
    pub fn success(values: Vec<Value>) -> Self {
        Self { ok: true, values }
    }

    pub fn failure(values: Vec<Value>) -> Self {
        Self { ok: false, values }
    }
}

/// 保護呼び出しプリミティブ
pub trait ProtectedCall {
    /// 失敗を握りつぶしてフラグで返す
    fn pcall(&self, f: &Function, args: &[Value]) -> ProtectedResult;

    /// 失敗時に `handler` をペイロード付きで呼び、その結果を返す
    fn xpcall(&self, f: &Function, handler: &Function, args: &[Value]) -> ProtectedResult;
}

/// 失敗した保護呼び出しの戻り値を組み立てる
///
/// 回復関数があればペイロードで呼び出してその結果を、なければペイロードそのものを返します。
/// 回復関数自体が失敗した場合はそのエラーのペイロードを返します。
pub fn recover(handler: Option<&Function>, err: &HostError) -> ProtectedResult {
    let payload = err.payload().into_value();
    match handler {
        None => ProtectedResult::failure(vec![payload]),
        Some(handler) => match handler.call(&[payload]) {
            Ok(values) => ProtectedResult::failure(values),
            Err(handler_err) => ProtectedResult::failure(vec![handler_err.payload().into_value()]),
        },
    }
}

/// ホスト本来の保護呼び出し
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProtectedCall;

impl ProtectedCall for HostProtectedCall {
    fn pcall(&self, f: &Function, args: &[Value]) -> ProtectedResult {
        match f.call(args) {
            Ok(values) => ProtectedResult::success(values),
            Err(err) => recover(None, &err),
        }
    }

    fn xpcall(&self, f: &Function, handler: &Function, args: &[Value]) -> ProtectedResult {
        match f.call(args) {
            Ok(values) => ProtectedResult::success(values),
            Err(err) => recover(Some(handler), &err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcall_contract() {
        let ok = Function::new(|args| Ok(args.to_vec()));
        let fail = Function::new(|_| Err(HostError::script("boom")));

        assert_eq!(
            HostProtectedCall.pcall(&ok, &[Value::Integer(1)]),
            ProtectedResult::success(vec![Value::Integer(1)])
        );
        assert_eq!(
            HostProtectedCall.pcall(&fail, &[]),
            ProtectedResult::failure(vec![Value::from("boom")])
        );
    }

    #[test]
    fn test_xpcall_contract() {
        let fail = Function::new(|_| Err(HostError::script("boom")));
        let handler = Function::new(|args| Ok(vec![Value::from(format!("handled: {}", args[0]))]));
        assert_eq!(
            HostProtectedCall.xpcall(&fail, &handler, &[]),
            ProtectedResult::failure(vec![Value::from("handled: boom")])
        );

        let bad_handler = Function::new(|_| Err(HostError::script("handler failed")));
        assert_eq!(
            HostProtectedCall.xpcall(&fail, &bad_handler, &[]),
            ProtectedResult::failure(vec![Value::from("handler failed")])
        );
    }
}
