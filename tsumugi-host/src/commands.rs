//! コマンド登録面

use crate::{Function, HostError, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// コマンド登録面
pub trait CommandSurface {
    /// コマンドを登録する（同名のものがあればエラー）
    fn add_command(&self, name: &str, help: &str, handler: Function) -> Result<()>;

    /// コマンドを削除する
    fn remove_command(&self, name: &str) -> bool;

    /// コマンド名 -> ヘルプ文字列
    fn commands(&self) -> BTreeMap<String, String>;

    /// コマンドのハンドラを取得する
    fn command_handler(&self, name: &str) -> Option<Function>;
}

struct RegisteredCommand {
    help: String,
    handler: Function,
}

/// ホスト全体のコマンド表
#[derive(Default)]
pub struct CommandTable {
    commands: RefCell<BTreeMap<String, RegisteredCommand>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandSurface for CommandTable {
    fn add_command(&self, name: &str, help: &str, handler: Function) -> Result<()> {
        let mut commands = self.commands.borrow_mut();
        if commands.contains_key(name) {
            return Err(HostError::DuplicateCommand(name.to_string()));
        }
        commands.insert(
            name.to_string(),
            RegisteredCommand {
                help: help.to_string(),
                handler,
            },
        );
        Ok(())
    }

    fn remove_command(&self, name: &str) -> bool {
        self.commands.borrow_mut().remove(name).is_some()
    }

    fn commands(&self) -> BTreeMap<String, String> {
        self.commands
            .borrow()
            .iter()
            .map(|(name, cmd)| (name.clone(), cmd.help.clone()))
            .collect()
    }

    fn command_handler(&self, name: &str) -> Option<Function> {
        self.commands.borrow().get(name).map(|cmd| cmd.handler.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_command() {
        let table = CommandTable::new();
        let f = Function::new(|_| Ok(vec![]));
        table.add_command("hello", "say hello", f.clone()).unwrap();
        assert_eq!(
            table.add_command("hello", "again", f.clone()),
            Err(HostError::DuplicateCommand("hello".into()))
        );
        assert_eq!(table.commands().get("hello").map(String::as_str), Some("say hello"));
        assert_eq!(table.command_handler("hello"), Some(f));

        assert!(table.remove_command("hello"));
        assert!(!table.remove_command("hello"));
        assert!(table.command_handler("hello").is_none());
    }
}
