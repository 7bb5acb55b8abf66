//! シナリオファイル
//!
//! デバッグ対象のホストを JSON で記述します。
//!
//! ```json
//! {
//!   "contexts": [
//!     { "name": "level", "coordinator": true },
//!     { "name": "alpha", "expose": { "ping": { "returns": true } } },
//!     { "name": "beta", "events": { "on_tick": { "pcall": "tick failed" } } }
//!   ]
//! }
//! ```

use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use tracing::debug;
use tsumugi_core::{Debuggee, Frontend, SharedRegistry};
use tsumugi_host::{Function, Host, HostError, ScriptContext, Value};

/// 組み込みのデモシナリオ
pub const DEMO: &str = r#"{
  "contexts": [
    { "name": "level", "coordinator": true,
      "expose": { "whoami": { "returns": "level" } } },
    { "name": "alpha",
      "expose": { "ping": { "returns": true }, "answer": { "returns": 42 } },
      "commands": { "alpha-fail": { "fails": "alpha command failed" } } },
    { "name": "beta",
      "expose": { "lookup": { "returns": null } },
      "events": { "on_tick": { "pcall": "beta tick handler failed" } } }
  ]
}"#;

/// シナリオ全体
#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub contexts: Vec<ContextSpec>,
}

/// 1つのコンテキストの記述
#[derive(Debug, Deserialize)]
pub struct ContextSpec {
    pub name: String,
    #[serde(default)]
    pub coordinator: bool,
    /// 他のコンテキストから呼べる関数
    #[serde(default)]
    pub expose: BTreeMap<String, Behavior>,
    /// イベント名 → ハンドラ
    #[serde(default)]
    pub events: BTreeMap<String, Behavior>,
    /// コマンド名 → ハンドラ
    #[serde(default)]
    pub commands: BTreeMap<String, Behavior>,
}

/// コールバックの振る舞い
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    /// 定数を返す
    Returns(serde_json::Value),
    /// メッセージ付きで失敗する
    Fails(String),
    /// 保護呼び出しの中で失敗する
    Pcall(String),
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse scenario")
    }

    pub fn load(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file {}", path))?;
        Self::from_json(&text)
    }

    /// 各コンテキストを作成してデバッガをアタッチし、ロードフェーズを終える
    pub fn build(
        &self,
        host: &Host,
        registry: &SharedRegistry,
        frontend: &Rc<dyn Frontend>,
    ) -> Result<Vec<Debuggee>> {
        let mut debuggees = Vec::with_capacity(self.contexts.len());
        for spec in &self.contexts {
            let context = host.create_context(&spec.name);
            let debuggee = Debuggee::attach(
                host,
                Rc::clone(&context),
                Rc::clone(registry),
                Rc::clone(frontend),
                spec.coordinator,
            )
            .with_context(|| format!("Failed to attach to '{}'", spec.name))?;

            for (name, behavior) in &spec.expose {
                debuggee.expose(name, behavior.to_function(&context));
            }
            for (event, behavior) in &spec.events {
                context
                    .events()
                    .on_event(event, Some(behavior.to_function(&context)))?;
            }
            for (name, behavior) in &spec.commands {
                context
                    .commands()
                    .add_command(name, "", behavior.to_function(&context))?;
            }
            debug!("context '{}' loaded", spec.name);
            debuggees.push(debuggee);
        }

        host.finish_loading();
        Ok(debuggees)
    }
}

impl Behavior {
    fn to_function(&self, context: &Rc<ScriptContext>) -> Function {
        match self.clone() {
            Behavior::Returns(value) => {
                let value = json_to_value(&value);
                Function::new(move |_| Ok(vec![value.clone()]))
            }
            Behavior::Fails(message) => {
                Function::new(move |_| Err(HostError::script(message.clone())))
            }
            Behavior::Pcall(message) => {
                let context: Weak<ScriptContext> = Rc::downgrade(context);
                Function::new(move |_| {
                    let Some(context) = context.upgrade() else {
                        return Ok(vec![]);
                    };
                    let message = message.clone();
                    let failing = Function::new(move |_| Err(HostError::script(message.clone())));
                    let result = context.protected().pcall(&failing, &[]);
                    let mut values = vec![Value::Bool(result.ok)];
                    values.extend(result.values);
                    Ok(values)
                })
            }
        }
    }
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Number(n.as_f64().unwrap_or(0.0)),
        },
        serde_json::Value::String(s) => Value::from(s.as_str()),
        other => Value::from(other.to_string()),
    }
}
