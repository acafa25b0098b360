//! CFG construction from surface statements
//!
//! Built bottom-up: every statement yields a [`Segment`] with an entry block,
//! an optional fall-through exit, and the `break`/`continue` blocks still
//! waiting for a destination. Only a `while` resolves pending jumps, so each
//! jump lands on its innermost enclosing loop.

use super::cfg::{BlockId, Cfg, CfgStmt};
use crate::ast::{Expr, FunctionDecl, Program, Stmt, StmtKind};
use tracing::{debug, warn};

#[derive(Debug)]
struct Segment {
    entry: BlockId,
    /// `None` when control never falls out of the segment
    exit: Option<BlockId>,
    breaks: Vec<BlockId>,
    continues: Vec<BlockId>,
}

impl Segment {
    fn single(block: BlockId) -> Self {
        Self {
            entry: block,
            exit: Some(block),
            breaks: Vec::new(),
            continues: Vec::new(),
        }
    }

    fn jump(block: BlockId) -> Self {
        Self {
            entry: block,
            exit: None,
            breaks: Vec::new(),
            continues: Vec::new(),
        }
    }
}

/// Builder for constructing a CFG from statements
pub struct CfgBuilder {
    cfg: Cfg,
}

impl CfgBuilder {
    pub fn new() -> Self {
        Self { cfg: Cfg::new() }
    }

    /// Graph of one function body; parameters are defined in the entry block
    pub fn build_for_function(mut self, func: &FunctionDecl) -> Cfg {
        let entry = self.cfg.entry;
        for param in &func.params {
            self.cfg.add_stmt(entry, CfgStmt::Param(param.name.clone()));
        }
        let body = self.build_sequence(&func.body);
        self.finish(body, &func.name)
    }

    /// Graph of every module's top-level statements, in order. Function
    /// bodies are not included; build those with
    /// [`build_for_function`](Self::build_for_function).
    pub fn build_for_program(mut self, program: &Program) -> Cfg {
        let stmts = program.modules.iter().flat_map(|m| m.body.iter());
        let body = self.build_sequence(stmts);
        self.finish(body, "<program>")
    }

    /// Graph of a bare statement list
    pub fn build_for_stmts(mut self, stmts: &[Stmt]) -> Cfg {
        let body = self.build_sequence(stmts);
        self.finish(body, "<block>")
    }

    fn finish(mut self, body: Option<Segment>, name: &str) -> Cfg {
        let (entry, exit) = (self.cfg.entry, self.cfg.exit);
        match body {
            Some(seg) => {
                self.cfg.add_edge(entry, seg.entry);
                if let Some(last) = seg.exit {
                    self.cfg.add_edge(last, exit);
                }
                for block in seg.breaks {
                    warn!(%block, graph = name, "break outside of a loop");
                    self.cfg.add_edge(block, exit);
                }
                for block in seg.continues {
                    warn!(%block, graph = name, "continue outside of a loop");
                    self.cfg.add_edge(block, exit);
                }
            }
            None => self.cfg.add_edge(entry, exit),
        }

        let pruned = self.cfg.remove_unreachable();
        debug!(graph = name, blocks = self.cfg.len(), pruned, "built cfg");
        self.cfg
    }

    /// Chain statements; stops after the first one that never falls through
    fn build_sequence<'a>(&mut self, stmts: impl IntoIterator<Item = &'a Stmt>) -> Option<Segment> {
        let mut seq: Option<Segment> = None;
        for stmt in stmts {
            let Some(seg) = self.build_stmt(stmt) else {
                continue;
            };
            match seq.as_mut() {
                None => seq = Some(seg),
                Some(acc) => {
                    if let Some(exit) = acc.exit {
                        self.cfg.add_edge(exit, seg.entry);
                    }
                    acc.exit = seg.exit;
                    acc.breaks.extend(seg.breaks);
                    acc.continues.extend(seg.continues);
                }
            }
            if seq.as_ref().is_some_and(|s| s.exit.is_none()) {
                break;
            }
        }
        seq
    }

    fn block_with(&mut self, stmt: CfgStmt) -> BlockId {
        let id = self.cfg.new_block();
        self.cfg.add_stmt(id, stmt);
        id
    }

    fn build_stmt(&mut self, stmt: &Stmt) -> Option<Segment> {
        match &stmt.kind {
            StmtKind::Let { .. } | StmtKind::Assign { .. } | StmtKind::Expr(_) => {
                let block = self.block_with(CfgStmt::Stmt(stmt.clone()));
                Some(Segment::single(block))
            }
            StmtKind::If {
                condition,
                then_body,
                else_body,
            } => Some(self.build_if(condition, then_body, else_body.as_deref())),
            StmtKind::While { condition, body } => Some(self.build_while(condition, body)),
            // declarations do not take part in control flow
            StmtKind::Function(_) | StmtKind::Struct(_) => None,
            StmtKind::Return(_) => {
                let block = self.block_with(CfgStmt::Stmt(stmt.clone()));
                self.cfg.add_edge(block, self.cfg.exit);
                Some(Segment::jump(block))
            }
            StmtKind::Break => {
                let block = self.block_with(CfgStmt::Stmt(stmt.clone()));
                let mut seg = Segment::jump(block);
                seg.breaks.push(block);
                Some(seg)
            }
            StmtKind::Continue => {
                let block = self.block_with(CfgStmt::Stmt(stmt.clone()));
                let mut seg = Segment::jump(block);
                seg.continues.push(block);
                Some(seg)
            }
        }
    }

    fn build_if(&mut self, condition: &Expr, then_body: &[Stmt], else_body: Option<&[Stmt]>) -> Segment {
        let cond = self.block_with(CfgStmt::Condition(condition.clone()));
        let mut seg = Segment::jump(cond);
        let mut fallthrough = Vec::new();

        for branch in [Some(then_body), else_body] {
            match branch.and_then(|body| self.build_sequence(body)) {
                Some(arm) => {
                    self.cfg.add_edge(cond, arm.entry);
                    fallthrough.extend(arm.exit);
                    seg.breaks.extend(arm.breaks);
                    seg.continues.extend(arm.continues);
                }
                // empty or missing branch: the condition falls straight through
                None => fallthrough.push(cond),
            }
        }

        if !fallthrough.is_empty() {
            let merge = self.cfg.new_block();
            for block in fallthrough {
                self.cfg.add_edge(block, merge);
            }
            seg.exit = Some(merge);
        }
        seg
    }

    fn build_while(&mut self, condition: &Expr, body: &[Stmt]) -> Segment {
        let header = self.block_with(CfgStmt::Condition(condition.clone()));
        let body = self.build_sequence(body);
        let merge = self.cfg.new_block();

        match body {
            Some(body) => {
                self.cfg.add_edge(header, body.entry);
                if let Some(last) = body.exit {
                    self.cfg.add_edge(last, header);
                }
                for block in body.breaks {
                    self.cfg.add_edge(block, merge);
                }
                for block in body.continues {
                    self.cfg.add_edge(block, header);
                }
            }
            None => self.cfg.add_edge(header, header),
        }
        self.cfg.add_edge(header, merge);

        Segment {
            entry: header,
            exit: Some(merge),
            breaks: Vec::new(),
            continues: Vec::new(),
        }
    }
}

impl Default for CfgBuilder {
    fn default() -> Self {
        Self::new()
    }
}
