//! Control flow graph over surface statements

use crate::ast::{Expr, Stmt};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Unique identifier for a basic block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub usize);

impl BlockId {
    pub const ENTRY: BlockId = BlockId(0);
    pub const EXIT: BlockId = BlockId(1);
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// A statement in a basic block
#[derive(Debug, Clone, PartialEq)]
pub enum CfgStmt {
    /// Incoming function parameter, defined on entry
    Param(String),
    /// Straight-line statement, or the `break`/`continue`/`return` that ends a block
    Stmt(Stmt),
    /// Branch condition of an `if` or loop header
    Condition(Expr),
}

impl fmt::Display for CfgStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CfgStmt::Param(name) => write!(f, "param {name}"),
            CfgStmt::Stmt(stmt) => write!(f, "{stmt}"),
            CfgStmt::Condition(cond) => write!(f, "branch {cond}"),
        }
    }
}

/// A basic block in the CFG
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub stmts: Vec<CfgStmt>,
    pub successors: Vec<BlockId>,
    pub predecessors: Vec<BlockId>,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            stmts: Vec::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
        }
    }
}

/// Control Flow Graph
///
/// Blocks are kept in creation order, which is also the order facts and
/// pretty-printed output are reported in.
#[derive(Debug, Clone)]
pub struct Cfg {
    pub blocks: IndexMap<BlockId, BasicBlock>,
    pub entry: BlockId,
    pub exit: BlockId,
    next_block_id: usize,
}

impl Cfg {
    pub fn new() -> Self {
        let mut cfg = Self {
            blocks: IndexMap::new(),
            entry: BlockId::ENTRY,
            exit: BlockId::EXIT,
            next_block_id: 0,
        };
        cfg.entry = cfg.new_block();
        cfg.exit = cfg.new_block();
        cfg
    }

    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.insert(id, BasicBlock::new(id));
        id
    }

    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        if let Some(block) = self.blocks.get_mut(&from) {
            if !block.successors.contains(&to) {
                block.successors.push(to);
            }
        }
        if let Some(block) = self.blocks.get_mut(&to) {
            if !block.predecessors.contains(&from) {
                block.predecessors.push(from);
            }
        }
    }

    pub fn add_stmt(&mut self, block: BlockId, stmt: CfgStmt) {
        if let Some(b) = self.blocks.get_mut(&block) {
            b.stmts.push(stmt);
        }
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get blocks in reverse postorder (useful for forward dataflow)
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut order = self.postorder();
        order.reverse();
        order
    }

    /// Get blocks in postorder (useful for backward dataflow)
    pub fn postorder(&self) -> Vec<BlockId> {
        let mut visited = HashSet::new();
        let mut postorder = Vec::new();
        self.dfs_postorder(self.entry, &mut visited, &mut postorder);
        postorder
    }

    fn dfs_postorder(&self, block: BlockId, visited: &mut HashSet<BlockId>, postorder: &mut Vec<BlockId>) {
        if !visited.insert(block) {
            return;
        }
        if let Some(b) = self.blocks.get(&block) {
            for &succ in &b.successors {
                self.dfs_postorder(succ, visited, postorder);
            }
        }
        postorder.push(block);
    }

    /// Remove blocks not reachable from entry (entry and exit always stay).
    /// Returns how many were removed.
    pub fn remove_unreachable(&mut self) -> usize {
        let reachable: HashSet<BlockId> = self.postorder().into_iter().collect();
        let (entry, exit) = (self.entry, self.exit);
        let before = self.blocks.len();
        self.blocks
            .retain(|id, _| *id == entry || *id == exit || reachable.contains(id));

        for block in self.blocks.values_mut() {
            block.predecessors.retain(|p| reachable.contains(p));
        }
        before - self.blocks.len()
    }
}

impl Default for Cfg {
    fn default() -> Self {
        Self::new()
    }
}

/// One block per paragraph: id and role, statements, then successor ids.
impl fmt::Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.values().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", block.id)?;
            if block.id == self.entry {
                write!(f, " (entry)")?;
            }
            if block.id == self.exit {
                write!(f, " (exit)")?;
            }
            writeln!(f, ":")?;
            for stmt in &block.stmts {
                writeln!(f, "    {stmt}")?;
            }
            if !block.successors.is_empty() {
                let succs: Vec<String> = block.successors.iter().map(ToString::to_string).collect();
                writeln!(f, "    -> {}", succs.join(", "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cfg_has_entry_and_exit() {
        let cfg = Cfg::new();
        assert_eq!(cfg.entry, BlockId::ENTRY);
        assert_eq!(cfg.exit, BlockId::EXIT);
        assert_eq!(cfg.len(), 2);
    }

    #[test]
    fn test_add_edge_dedupes() {
        let mut cfg = Cfg::new();
        let b = cfg.new_block();
        cfg.add_edge(cfg.entry, b);
        cfg.add_edge(cfg.entry, b);
        assert_eq!(cfg.block(cfg.entry).unwrap().successors, vec![b]);
        assert_eq!(cfg.block(b).unwrap().predecessors, vec![cfg.entry]);
    }

    #[test]
    fn test_reverse_postorder_starts_at_entry() {
        let mut cfg = Cfg::new();
        let a = cfg.new_block();
        let b = cfg.new_block();
        cfg.add_edge(cfg.entry, a);
        cfg.add_edge(a, b);
        cfg.add_edge(b, a);
        cfg.add_edge(b, cfg.exit);

        let rpo = cfg.reverse_postorder();
        assert_eq!(rpo.first(), Some(&cfg.entry));
        assert_eq!(rpo, vec![cfg.entry, a, b, cfg.exit]);
        assert_eq!(cfg.postorder(), vec![cfg.exit, b, a, cfg.entry]);
    }

    #[test]
    fn test_remove_unreachable_keeps_exit() {
        let mut cfg = Cfg::new();
        let a = cfg.new_block();
        let dead = cfg.new_block();
        cfg.add_edge(cfg.entry, a);
        cfg.add_edge(a, a);
        cfg.add_edge(dead, cfg.exit);

        assert_eq!(cfg.remove_unreachable(), 1);
        assert!(cfg.block(dead).is_none());
        assert!(cfg.block(cfg.exit).unwrap().predecessors.is_empty());
    }
}
