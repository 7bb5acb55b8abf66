//! スレッド（コンテキスト）レジストリ

use crate::frame::{MAX_THREAD_ID, TAG_MASK};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// コーディネーターが公開する固定のインターフェース名
pub const COORDINATOR_INTERFACE: &str = "debugadapter";

/// 通常のコンテキストが公開するインターフェース名の接頭辞
pub const INTERFACE_PREFIX: &str = "__debugadapter_";

/// スレッドID（コンテキストごとに1つ、1始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// レジストリのエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("cannot register '{0}': thread ids are limited to {max}", max = MAX_THREAD_ID)]
    Full(String),
}

/// コンテキストが自分のコアを公開するインターフェース名
pub fn interface_name(context: &str, is_coordinator: bool) -> String {
    if is_coordinator {
        COORDINATOR_INTERFACE.to_string()
    } else {
        format!("{}{}", INTERFACE_PREFIX, context)
    }
}

/// レジストリに登録されたコンテキストの情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub name: String,
    pub is_coordinator: bool,
    /// 現在の停止スナップショットのタグ（所有コンテキストだけが更新する）
    pub snapshot_tag: u32,
}

impl ThreadInfo {
    pub fn interface_name(&self) -> String {
        interface_name(&self.name, self.is_coordinator)
    }
}

/// あるコンテキストから見たスレッド一覧の要素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextView {
    pub id: ThreadId,
    pub name: String,
    #[serde(skip)]
    pub is_local: bool,
}

/// プロセス全体のスレッドレジストリ
///
/// 追記のみで、登録されたエントリは削除されません。
/// 反復順序は登録順です。
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    threads: Vec<ThreadInfo>,
    by_id: HashMap<ThreadId, usize>,
    by_name: HashMap<String, usize>,
}

/// コンテキスト間で共有されるレジストリ
pub type SharedRegistry = Rc<RefCell<ThreadRegistry>>;

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 共有用のレジストリを作成する
    pub fn shared() -> SharedRegistry {
        Rc::new(RefCell::new(Self::new()))
    }

    /// コンテキストを登録する
    ///
    /// 同名のコンテキストが既にあればそのIDを返します。
    /// コーディネーターは1つだけで、2つ目以降は通常のコンテキストとして登録します。
    /// スレッドIDがフレームIDに収まらなくなる登録はエラーです。
    pub fn register(&mut self, name: &str, is_coordinator: bool) -> Result<ThreadId, RegistryError> {
        if let Some(&idx) = self.by_name.get(name) {
            return Ok(self.threads[idx].id);
        }
        if self.threads.len() >= MAX_THREAD_ID as usize {
            return Err(RegistryError::Full(name.to_string()));
        }

        let is_coordinator = if is_coordinator && self.coordinator().is_some() {
            warn!("coordinator already registered, '{}' registered as an ordinary context", name);
            false
        } else {
            is_coordinator
        };

        let id = ThreadId(self.threads.len() as u32 + 1);
        let idx = self.threads.len();
        self.threads.push(ThreadInfo {
            id,
            name: name.to_string(),
            is_coordinator,
            snapshot_tag: 0,
        });
        self.by_id.insert(id, idx);
        self.by_name.insert(name.to_string(), idx);
        Ok(id)
    }

    pub fn get(&self, id: ThreadId) -> Option<&ThreadInfo> {
        self.by_id.get(&id).map(|&idx| &self.threads[idx])
    }

    pub fn by_name(&self, name: &str) -> Option<&ThreadInfo> {
        self.by_name.get(name).map(|&idx| &self.threads[idx])
    }

    /// 登録順に全エントリを返す
    pub fn iter(&self) -> impl Iterator<Item = &ThreadInfo> {
        self.threads.iter()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn coordinator(&self) -> Option<&ThreadInfo> {
        self.threads.iter().find(|t| t.is_coordinator)
    }

    pub fn snapshot_tag(&self, id: ThreadId) -> Option<u32> {
        self.get(id).map(|t| t.snapshot_tag)
    }

    /// 停止スナップショットを進めて新しいタグを返す
    pub fn bump_snapshot(&mut self, id: ThreadId) -> Option<u32> {
        let idx = *self.by_id.get(&id)?;
        let info = &mut self.threads[idx];
        info.snapshot_tag = (info.snapshot_tag + 1) & TAG_MASK;
        Some(info.snapshot_tag)
    }

    /// `local` から見たスレッド一覧
    pub fn view(&self, local: ThreadId) -> Vec<ContextView> {
        self.threads
            .iter()
            .map(|t| ContextView {
                id: t.id,
                name: t.name.clone(),
                is_local: t.id == local,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_append_only_and_idempotent() {
        let mut registry = ThreadRegistry::new();
        let a = registry.register("alpha", false).unwrap();
        let b = registry.register("beta", false).unwrap();
        assert_eq!(a, ThreadId(1));
        assert_eq!(b, ThreadId(2));
        assert_eq!(registry.register("alpha", false).unwrap(), a);
        assert_eq!(registry.len(), 2);

        let names: Vec<_> = registry.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(registry.by_name("beta").map(|t| t.id), Some(b));
        assert!(registry.get(ThreadId(9)).is_none());
    }

    #[test]
    fn test_single_coordinator() {
        let mut registry = ThreadRegistry::new();
        let level = registry.register("level", true).unwrap();
        let other = registry.register("other", true).unwrap();
        assert_eq!(registry.coordinator().map(|t| t.id), Some(level));
        assert!(!registry.get(other).unwrap().is_coordinator);
        assert_eq!(registry.get(level).unwrap().interface_name(), COORDINATOR_INTERFACE);
        assert_eq!(registry.get(other).unwrap().interface_name(), "__debugadapter_other");
    }

    #[test]
    fn test_snapshot_tag() {
        let mut registry = ThreadRegistry::new();
        let a = registry.register("alpha", false).unwrap();
        assert_eq!(registry.snapshot_tag(a), Some(0));
        assert_eq!(registry.bump_snapshot(a), Some(1));
        assert_eq!(registry.snapshot_tag(a), Some(1));
        assert_eq!(registry.bump_snapshot(ThreadId(7)), None);
    }

    #[test]
    fn test_register_rejects_ids_beyond_frame_id_range() {
        let mut registry = ThreadRegistry::new();
        for i in 0..MAX_THREAD_ID {
            registry.register(&format!("ctx{}", i), false).unwrap();
        }
        assert_eq!(registry.by_name("ctx0").map(|t| t.id), Some(ThreadId(1)));
        assert_eq!(registry.len(), MAX_THREAD_ID as usize);

        assert_eq!(
            registry.register("one-too-many", false),
            Err(RegistryError::Full("one-too-many".into()))
        );
        // 既存の名前は引き続き引ける
        assert_eq!(registry.register("ctx7", false), Ok(ThreadId(8)));
        assert_eq!(registry.len(), MAX_THREAD_ID as usize);
    }

    #[test]
    fn test_view_marks_local() {
        let mut registry = ThreadRegistry::new();
        let a = registry.register("alpha", false).unwrap();
        registry.register("beta", false).unwrap();
        let view = registry.view(a);
        assert!(view[0].is_local);
        assert!(!view[1].is_local);
    }
}
