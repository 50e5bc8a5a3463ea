//! process_tree_task - 指定 PID のルート祖先から下のプロセスツリーを返す
//!
//! sysinfo のスナップショットを blocking pool で取り、
//! その表からツリーを組み立てます（組み立て自体は純粋関数）。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

use crate::error::TaskError;
use crate::typed::schema::PID;
use crate::typed::{FieldSpec, ParameterSchema, Task};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessTreeParameters {
    pub pid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessNode {
    pub pid: u32,
    pub name: String,
    pub cmdline: Vec<String>,
    pub children: Vec<ProcessNode>,
}

impl ProcessNode {
    pub fn find(&self, pid: u32) -> Option<&ProcessNode> {
        if self.pid == pid {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(pid))
    }
}

/// One row of a process table snapshot.
#[derive(Debug, Clone)]
pub(crate) struct ProcessInfo {
    pub parent: Option<u32>,
    pub name: String,
    pub cmdline: Vec<String>,
}

type ProcessTable = HashMap<u32, ProcessInfo>;

fn snapshot() -> ProcessTable {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::OnlyIfNotSet),
    );
    system
        .processes()
        .iter()
        // Linux lists threads as processes too.
        .filter(|(_, p)| p.thread_kind().is_none())
        .map(|(pid, p)| {
            let info = ProcessInfo {
                parent: p.parent().map(|pp| pp.as_u32()),
                name: p.name().to_string_lossy().into_owned(),
                cmdline: p
                    .cmd()
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect(),
            };
            (pid.as_u32(), info)
        })
        .collect()
}

fn root_of(table: &ProcessTable, pid: u32) -> u32 {
    let mut current = pid;
    let mut seen = HashSet::from([pid]);
    while let Some(parent) = table.get(&current).and_then(|p| p.parent) {
        if parent == 0 || !table.contains_key(&parent) || !seen.insert(parent) {
            break;
        }
        current = parent;
    }
    current
}

pub(crate) fn build_tree(table: &ProcessTable, pid: u32) -> Result<ProcessNode, TaskError> {
    if !table.contains_key(&pid) {
        return Err(TaskError::NoSuchProcess(pid));
    }

    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (&child, info) in table {
        if let Some(parent) = info.parent.filter(|&p| p != child) {
            children.entry(parent).or_default().push(child);
        }
    }
    for list in children.values_mut() {
        list.sort_unstable();
    }

    let root = root_of(table, pid);
    let mut visited = HashSet::new();
    Ok(node(table, &children, root, &mut visited))
}

fn node(
    table: &ProcessTable,
    children: &HashMap<u32, Vec<u32>>,
    pid: u32,
    visited: &mut HashSet<u32>,
) -> ProcessNode {
    visited.insert(pid);
    let info = table.get(&pid);
    let kids = children
        .get(&pid)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter(|c| !visited.contains(c))
        .copied()
        .collect::<Vec<_>>();

    ProcessNode {
        pid,
        name: info.map(|i| i.name.clone()).unwrap_or_default(),
        cmdline: info.map(|i| i.cmdline.clone()).unwrap_or_default(),
        children: kids
            .into_iter()
            .filter_map(|c| (!visited.contains(&c)).then(|| node(table, children, c, visited)))
            .collect(),
    }
}

#[derive(Debug, Default)]
pub struct ProcessTreeTask;

#[async_trait]
impl Task for ProcessTreeTask {
    const KIND: &'static str = "process_tree_task";
    const SCHEMA: ParameterSchema = ParameterSchema::new(
        "ProcessTreeParameters",
        &[FieldSpec::required("pid", PID)],
    );
    type Params = ProcessTreeParameters;
    type Output = ProcessNode;

    async fn execute(&self, params: ProcessTreeParameters) -> Result<ProcessNode, TaskError> {
        let pid = params.pid;
        let tree = tokio::task::spawn_blocking(move || {
            let table = snapshot();
            debug!(processes = table.len(), "process table captured");
            build_tree(&table, pid)
        })
        .await
        .map_err(|e| TaskError::Other(format!("process snapshot failed: {e}")))??;
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(u32, Option<u32>, &str)]) -> ProcessTable {
        rows.iter()
            .map(|&(pid, parent, name)| {
                (
                    pid,
                    ProcessInfo {
                        parent,
                        name: name.to_string(),
                        cmdline: vec![name.to_string()],
                    },
                )
            })
            .collect()
    }

    #[test]
    fn tree_starts_at_root_ancestor_with_sorted_children() {
        let t = table(&[
            (1, Some(0), "init"),
            (30, Some(1), "sshd"),
            (20, Some(1), "cron"),
            (31, Some(30), "bash"),
            (40, Some(31), "vim"),
        ]);

        let tree = build_tree(&t, 40).unwrap();
        assert_eq!(tree.pid, 1);
        assert_eq!(tree.name, "init");
        let kids: Vec<u32> = tree.children.iter().map(|c| c.pid).collect();
        assert_eq!(kids, vec![20, 30]);

        let vim = tree.find(40).unwrap();
        assert_eq!(vim.cmdline, vec!["vim"]);
        assert!(vim.children.is_empty());
    }

    #[test]
    fn orphan_parent_makes_the_process_its_own_root() {
        let t = table(&[(7, Some(999), "orphan"), (8, Some(7), "child")]);
        let tree = build_tree(&t, 8).unwrap();
        assert_eq!(tree.pid, 7);
        assert_eq!(tree.children[0].pid, 8);
    }

    #[test]
    fn parent_cycles_terminate() {
        let t = table(&[(2, Some(3), "a"), (3, Some(2), "b")]);
        let tree = build_tree(&t, 2).unwrap();
        assert!(tree.find(2).is_some());
        assert!(tree.find(3).is_some());
    }

    #[test]
    fn missing_pid_is_an_error() {
        let t = table(&[(1, None, "init")]);
        assert!(matches!(build_tree(&t, 5), Err(TaskError::NoSuchProcess(5))));
    }

    #[tokio::test]
    async fn current_process_appears_in_its_tree() {
        let me = std::process::id();
        let tree = ProcessTreeTask
            .execute(ProcessTreeParameters { pid: me })
            .await
            .unwrap();
        assert!(tree.find(me).is_some());
    }

    #[tokio::test]
    async fn unknown_pid_fails_execution() {
        let err = ProcessTreeTask
            .execute(ProcessTreeParameters { pid: u32::MAX })
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::NoSuchProcess(p) if p == u32::MAX));
    }
}
