//! 遅延束縛テーブル
//!
//! 計装と初期化順序を切り離すための、コンテキストローカルな名前 -> 関数の表。

use std::cell::RefCell;
use std::collections::HashMap;
use tsumugi_host::{Function, Value};

/// 遅延束縛テーブル
#[derive(Default)]
pub struct LateBindings {
    slots: RefCell<HashMap<String, Function>>,
}

impl LateBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// 関数を束縛し、以前の関数を返す
    pub fn set(&self, name: &str, f: Function) -> Option<Function> {
        self.slots.borrow_mut().insert(name.to_string(), f)
    }

    pub fn get(&self, name: &str) -> Option<Function> {
        self.slots.borrow().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Function> {
        self.slots.borrow_mut().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.borrow().contains_key(name)
    }

    /// 束縛されていれば呼び出す
    pub fn call(&self, name: &str, args: &[Value]) -> Option<tsumugi_host::Result<Vec<Value>>> {
        // 借用を解放してから呼び出す
        let f = self.get(name)?;
        Some(f.call(args))
    }
}
