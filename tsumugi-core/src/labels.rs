//! コールバックのラベル管理
//!
//! コールバックの同一性から、それが登録された場所の説明（ラベル）を引けるようにします。
//! 逆引き表はコールバックを弱参照で持つので、ラベルを付けたことで
//! コールバックの寿命が延びることはありません。

use crate::frontend::Frontend;
use crate::protocol::ProtocolEvent;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::{debug, warn};
use tsumugi_host::{Function, FunctionId, InterfaceTable, WeakFunction};

/// 複数の登録箇所で共有されたコールバックに付ける汎用ラベル
pub const SHARED_LABEL: &str = "shared handler";

/// 弱参照のラベル表
#[derive(Default)]
pub struct LabelMap {
    entries: HashMap<FunctionId, (WeakFunction, String)>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// ラベルを設定し、以前の（生きている）ラベルを返す
    pub fn insert(&mut self, f: &Function, label: impl Into<String>) -> Option<String> {
        let previous = self.get(f).map(str::to_string);
        self.entries.insert(f.id(), (f.downgrade(), label.into()));
        previous
    }

    /// ラベルを引く
    ///
    /// 同じアドレスに別の関数が割り当てられている可能性があるので、
    /// 弱参照を戻して同一性を確認します。
    pub fn get(&self, f: &Function) -> Option<&str> {
        let (weak, label) = self.entries.get(&f.id())?;
        match weak.upgrade() {
            Some(live) if live.ptr_eq(f) => Some(label.as_str()),
            _ => None,
        }
    }

    pub fn remove(&mut self, f: &Function) -> Option<String> {
        let label = self.get(f).map(str::to_string);
        if label.is_some() {
            self.entries.remove(&f.id());
        }
        label
    }

    /// 解放済みのコールバックのエントリを削除し、削除数を返す
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (weak, _)| weak.is_alive());
        before - self.entries.len()
    }

    /// 生きているエントリの数
    pub fn len(&self) -> usize {
        self.entries.values().filter(|(weak, _)| weak.is_alive()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 登録箇所の追跡とラベル解決
///
/// 計装済みの各登録面から呼ばれ、スロットの上書きや共有を検出して警告します。
pub struct Labeler {
    labels: RefCell<LabelMap>,
    /// このコンテキストが公開したインターフェース
    published: RefCell<BTreeMap<String, InterfaceTable>>,
    frontend: Rc<dyn Frontend>,
}

impl Labeler {
    pub fn new(frontend: Rc<dyn Frontend>) -> Self {
        Self {
            labels: RefCell::new(LabelMap::new()),
            published: RefCell::new(BTreeMap::new()),
            frontend,
        }
    }

    fn warn_shared(&self, site: &str) {
        let message = format!(
            "callback registered at '{}' is also reachable elsewhere, labeled as '{}'",
            site, SHARED_LABEL
        );
        warn!("{}", message);
        self.frontend.emit(&ProtocolEvent::console(message));
    }

    /// スロットの登録内容が `old` から `new` に変わったことを記録する
    ///
    /// `old` は元の登録面から外された後の値を渡すこと。
    /// それでも他に強参照が残っていれば、新旧とも共有ラベルに格下げします。
    /// ついでに解放済みのコールバックのエントリを掃除します。
    pub fn relabel(&self, site: &str, old: Option<Function>, new: Option<&Function>) {
        let pruned = self.labels.borrow_mut().prune();
        if pruned > 0 {
            debug!("pruned {} labels of dropped callbacks", pruned);
        }

        if let Some(old) = old {
            let replaced = new.map_or(true, |n| !n.ptr_eq(&old));
            if replaced {
                let still_reachable = old.strong_count() > 1;
                let mut labels = self.labels.borrow_mut();
                if labels.get(&old) == Some(site) {
                    labels.remove(&old);
                }
                if let (Some(new), true) = (new, still_reachable) {
                    labels.insert(&old, SHARED_LABEL);
                    labels.insert(new, SHARED_LABEL);
                    drop(labels);
                    self.warn_shared(site);
                    return;
                }
            }
        }

        let Some(new) = new else {
            return;
        };
        let mut labels = self.labels.borrow_mut();
        let current = labels.get(new).map(str::to_string);
        match current.as_deref() {
            None => {
                labels.insert(new, site);
            }
            Some(current) if current == site || current == SHARED_LABEL => {}
            Some(_) => {
                // 同じコールバックが別のスロットにも登録されている
                labels.insert(new, SHARED_LABEL);
                drop(labels);
                self.warn_shared(site);
            }
        }
    }

    /// インターフェースの公開を記録し、各関数にラベルを付ける
    ///
    /// 空のテーブルでも解放済みのエントリは掃除します。
    pub fn publish(&self, interface: &str, table: &InterfaceTable) {
        self.labels.borrow_mut().prune();
        let functions: Vec<(String, Function)> = table
            .borrow()
            .iter()
            .map(|(name, f)| (name.clone(), f.clone()))
            .collect();
        for (name, f) in &functions {
            self.relabel(&format!("{}::{}", name, interface), None, Some(f));
        }
        self.published
            .borrow_mut()
            .insert(interface.to_string(), Rc::clone(table));
    }

    /// インターフェースの削除を記録する
    pub fn unpublish(&self, interface: &str) {
        let Some(table) = self.published.borrow_mut().remove(interface) else {
            return;
        };
        let functions: Vec<(String, Function)> = table
            .borrow()
            .iter()
            .map(|(name, f)| (name.clone(), f.clone()))
            .collect();
        let mut labels = self.labels.borrow_mut();
        for (name, f) in &functions {
            if labels.get(f) == Some(format!("{}::{}", name, interface).as_str()) {
                labels.remove(f);
            }
        }
    }

    /// 任意のコールバックのラベルを解決する
    ///
    /// 直接引けなければ、公開済みインターフェースを走査して
    /// `remote <関数>::<インターフェース>` を返します（公開後に追加された関数用）。
    pub fn describe(&self, f: &Function) -> Option<String> {
        if let Some(label) = self.labels.borrow().get(f) {
            return Some(label.to_string());
        }

        let published = self.published.borrow();
        for (interface, table) in published.iter() {
            let table = table.borrow();
            if let Some((name, _)) = table.iter().find(|(_, candidate)| candidate.ptr_eq(f)) {
                return Some(format!("remote {}::{}", name, interface));
            }
        }
        None
    }

    /// 生きているラベルの数
    pub fn live_labels(&self) -> usize {
        self.labels.borrow().len()
    }

    /// 解放済みのエントリを掃除する
    pub fn prune(&self) -> usize {
        self.labels.borrow_mut().prune()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::RecordingFrontend;
    use tsumugi_host::interface_table;

    fn noop() -> Function {
        Function::new(|_| Ok(vec![]))
    }

    #[test]
    fn test_label_map_is_weak() {
        let mut map = LabelMap::new();
        let f = noop();
        map.insert(&f, "on_tick");
        assert_eq!(map.get(&f), Some("on_tick"));
        assert_eq!(f.strong_count(), 1);

        drop(f);
        assert_eq!(map.len(), 0);
        assert_eq!(map.prune(), 1);
    }

    #[test]
    fn test_registration_prunes_dropped_callbacks() {
        let labeler = Labeler::new(Rc::new(RecordingFrontend::new()));
        let handlers: Vec<Function> = (0..3).map(|_| noop()).collect();
        for (i, f) in handlers.iter().enumerate() {
            labeler.relabel(&format!("on_nth_tick({})", i), None, Some(f));
        }
        // 登録面を通さずに解放された
        drop(handlers);

        let f = noop();
        labeler.relabel("on_tick", None, Some(&f));
        assert_eq!(labeler.live_labels(), 1);
        assert_eq!(labeler.prune(), 0);

        let g = noop();
        labeler.relabel("on_load", None, Some(&g));
        drop(g);
        labeler.publish("alpha", &interface_table(Vec::<(String, Function)>::new()));
        assert_eq!(labeler.prune(), 0);
        assert_eq!(labeler.describe(&f).as_deref(), Some("on_tick"));
    }

    #[test]
    fn test_overwrite_with_unreachable_old() {
        let frontend = Rc::new(RecordingFrontend::new());
        let labeler = Labeler::new(frontend.clone());
        let old = noop();
        labeler.relabel("on_tick", None, Some(&old));

        let new = noop();
        let old_weak = old.downgrade();
        // 登録面から外れて他に参照がない
        labeler.relabel("on_tick", Some(old), Some(&new));

        assert!(!old_weak.is_alive());
        assert_eq!(labeler.describe(&new).as_deref(), Some("on_tick"));
        assert_eq!(labeler.live_labels(), 1);
        assert!(frontend.events().is_empty());
    }

    #[test]
    fn test_overwrite_with_reachable_old() {
        let frontend = Rc::new(RecordingFrontend::new());
        let labeler = Labeler::new(frontend.clone());
        let old = noop();
        let new = noop();
        labeler.relabel("on_tick", None, Some(&old));
        labeler.relabel("on_tick", Some(old.clone()), Some(&new));

        assert_eq!(labeler.describe(&old).as_deref(), Some(SHARED_LABEL));
        assert_eq!(labeler.describe(&new).as_deref(), Some(SHARED_LABEL));
        assert_eq!(frontend.events().len(), 1);
    }

    #[test]
    fn test_same_callback_in_two_slots() {
        let frontend = Rc::new(RecordingFrontend::new());
        let labeler = Labeler::new(frontend.clone());
        let f = noop();
        labeler.relabel("on_tick", None, Some(&f));
        labeler.relabel("on_built_entity", None, Some(&f));
        assert_eq!(labeler.describe(&f).as_deref(), Some(SHARED_LABEL));
        assert_eq!(frontend.events().len(), 1);
    }

    #[test]
    fn test_unregister_removes_label() {
        let labeler = Labeler::new(Rc::new(RecordingFrontend::new()));
        let f = noop();
        labeler.relabel("hello", None, Some(&f));
        labeler.relabel("hello", Some(f.clone()), None);
        assert_eq!(labeler.describe(&f), None);
    }

    #[test]
    fn test_describe_falls_back_to_published_interfaces() {
        let labeler = Labeler::new(Rc::new(RecordingFrontend::new()));
        let ping = noop();
        let table = interface_table([("ping", ping.clone())]);
        labeler.publish("alpha", &table);
        assert_eq!(labeler.describe(&ping).as_deref(), Some("ping::alpha"));

        let late = noop();
        table.borrow_mut().insert("late".into(), late.clone());
        assert_eq!(labeler.describe(&late).as_deref(), Some("remote late::alpha"));

        labeler.unpublish("alpha");
        assert_eq!(labeler.describe(&ping), None);
        assert_eq!(labeler.describe(&late), None);
    }
}
