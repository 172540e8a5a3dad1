//! Control graph construction from label-delimited instruction streams.
//!
//! A routine body is a flat list of instructions. Entry points (`L <-`,
//! `L1, L2 <- (c)`) open a block and exit points (`-> L`, `(c) -> L1, L2`)
//! close one. The first block is opened implicitly and a block still open at
//! the end of the body is closed implicitly, so an empty body is a single
//! empty block.
//!
//! Blocks are linked through label identity rather than explicit edges: a
//! label written in an exit point of block A and in an entry point of block B
//! makes A a predecessor of B. Since control flow is bidirectional, entry and
//! exit roles are indexed in separate maps.
//!
//! Construction never aborts. Problems are reported as diagnostics and the
//! caller still gets a best-effort graph.

use std::fmt;

use ara_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use ara_ir::ast::{Instruction, RoutineDef};
use ara_ir::{Direction, Ident, Name, Span};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Block ID within one routine's control graph.
///
/// IDs are allocated in source order starting from 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Create a new block ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// A maximal straight-line run of instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block<'r> {
    pub id: BlockId,
    pub instructions: &'r [Instruction],
}

impl<'r> Block<'r> {
    /// Labels of the entry point this block starts with, if any.
    pub fn entry_labels(&self) -> impl Iterator<Item = &'r Ident> {
        self.instructions
            .first()
            .filter(|instruction| instruction.is_entry_point())
            .into_iter()
            .flat_map(Instruction::labels)
    }

    /// Labels of the exit point this block ends with, if any.
    pub fn exit_labels(&self) -> impl Iterator<Item = &'r Ident> {
        self.instructions
            .last()
            .filter(|instruction| instruction.is_exit_point())
            .into_iter()
            .flat_map(Instruction::labels)
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// The block graph of one routine.
#[derive(Clone, Debug)]
pub struct ControlGraph<'r> {
    routine: Name,
    blocks: Vec<Block<'r>>,
    /// Label -> block that has it in an entry point.
    successors: FxHashMap<Name, BlockId>,
    /// Label -> block that has it in an exit point.
    predecessors: FxHashMap<Name, BlockId>,
}

impl<'r> ControlGraph<'r> {
    /// Build the graph of `routine`, reporting structural problems to `queue`.
    pub fn build(routine: &'r RoutineDef, queue: &mut DiagnosticQueue) -> Self {
        let blocks = BlockExtractor::new(&routine.body).extract(queue);
        let graph = GraphLinker::new(blocks).link(routine.name.name.clone(), queue);

        tracing::debug!(
            routine = %routine.name,
            num_blocks = graph.blocks.len(),
            num_labels = graph.successors.len(),
            "control graph built"
        );

        graph
    }

    pub fn routine(&self) -> &Name {
        &self.routine
    }

    pub fn blocks(&self) -> &[Block<'r>] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &Block<'r> {
        &self.blocks[id.index()]
    }

    /// Number of blocks. Never zero.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always `false`; even an empty body has one block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The block execution starts in.
    pub fn begin(&self) -> BlockId {
        BlockId::new(0)
    }

    /// The block execution ends in.
    pub fn end(&self) -> BlockId {
        BlockId::new(u32::try_from(self.blocks.len().saturating_sub(1)).unwrap_or(u32::MAX))
    }

    /// Blocks that can transfer control into `id`, without duplicates.
    pub fn predecessors(&self, id: BlockId) -> SmallVec<[BlockId; 2]> {
        lookup(self.block(id).entry_labels(), &self.predecessors)
    }

    /// Blocks `id` can transfer control to, without duplicates.
    pub fn successors(&self, id: BlockId) -> SmallVec<[BlockId; 2]> {
        lookup(self.block(id).exit_labels(), &self.successors)
    }

    /// The block a jump along `direction` to `label` lands in.
    ///
    /// Forward jumps land in the block with `label` in its entry point,
    /// backward jumps in the block with `label` in its exit point.
    pub fn block_by_label(&self, label: &str, direction: Direction) -> Option<BlockId> {
        direction
            .choose(&self.successors, &self.predecessors)
            .get(label)
            .copied()
    }

    /// One line per block: id, instruction count and labels.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            let entry: Vec<String> = block.entry_labels().map(ToString::to_string).collect();
            let exit: Vec<String> = block.exit_labels().map(ToString::to_string).collect();
            let preds: Vec<String> = self.predecessors(block.id).iter().map(ToString::to_string).collect();
            let succs: Vec<String> = self.successors(block.id).iter().map(ToString::to_string).collect();
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!(
                "{}: {} instructions, entry [{}] exit [{}], preds [{}] succs [{}]",
                block.id,
                block.instructions.len(),
                entry.join(", "),
                exit.join(", "),
                preds.join(", "),
                succs.join(", "),
            ));
        }
        out
    }
}

fn lookup<'a>(
    labels: impl Iterator<Item = &'a Ident>,
    map: &FxHashMap<Name, BlockId>,
) -> SmallVec<[BlockId; 2]> {
    let mut result = SmallVec::new();
    for label in labels {
        if let Some(&id) = map.get(&label.name) {
            if !result.contains(&id) {
                result.push(id);
            }
        }
    }
    result
}

// Block extraction

/// Splits a body into blocks. Holds the open block, if any, as a start
/// index into the body.
struct BlockExtractor<'r> {
    body: &'r [Instruction],
    open: Option<usize>,
    blocks: Vec<Block<'r>>,
}

impl<'r> BlockExtractor<'r> {
    fn new(body: &'r [Instruction]) -> Self {
        BlockExtractor {
            body,
            open: None,
            blocks: Vec::new(),
        }
    }

    fn extract(mut self, queue: &mut DiagnosticQueue) -> Vec<Block<'r>> {
        self.open = Some(0);
        for (index, instruction) in self.body.iter().enumerate() {
            if instruction.is_entry_point() {
                self.start_block(index, instruction.span(), queue);
            }
            if self.open.is_none() {
                queue.add(
                    Diagnostic::error(ErrorCode::E1002)
                        .with_message("instructions are only allowed to appear within a block")
                        .with_label(instruction.span(), "not preceded by an entry point")
                        .with_suggestion("add an entry point such as `L <-` before this instruction"),
                );
                continue;
            }
            if instruction.is_exit_point() {
                self.finish_block(index + 1);
            }
        }
        self.finish_block(self.body.len());
        self.blocks
    }

    fn start_block(&mut self, index: usize, span: Span, queue: &mut DiagnosticQueue) {
        if self.open.is_some() {
            queue.add(
                Diagnostic::error(ErrorCode::E1001)
                    .with_message("entry points are only allowed to appear after an exit point")
                    .with_label(span, "the current block has not been closed"),
            );
        } else {
            self.open = Some(index);
        }
    }

    fn finish_block(&mut self, end: usize) {
        if let Some(start) = self.open.take() {
            let id = BlockId::new(u32::try_from(self.blocks.len()).unwrap_or(u32::MAX));
            self.blocks.push(Block {
                id,
                instructions: &self.body[start..end],
            });
        }
    }
}

// Linking

struct GraphLinker<'r> {
    blocks: Vec<Block<'r>>,
    successors: FxHashMap<Name, (BlockId, Span)>,
    predecessors: FxHashMap<Name, (BlockId, Span)>,
}

impl<'r> GraphLinker<'r> {
    fn new(blocks: Vec<Block<'r>>) -> Self {
        GraphLinker {
            blocks,
            successors: FxHashMap::default(),
            predecessors: FxHashMap::default(),
        }
    }

    /// Index the exit labels of the begin block, both kinds of labels of
    /// inner blocks, then the entry labels of the end block. Control never
    /// enters the begin block nor leaves the end block through a label, so
    /// those labels stay unindexed. A single block indexes nothing.
    fn link(mut self, routine: Name, queue: &mut DiagnosticQueue) -> ControlGraph<'r> {
        let count = self.blocks.len();
        if count > 1 {
            self.index_exits(0, queue);
            for index in 1..count - 1 {
                self.index_entries(index, queue);
                self.index_exits(index, queue);
            }
            self.index_entries(count - 1, queue);
        }

        self.report_unmatched(queue);

        ControlGraph {
            routine,
            blocks: self.blocks,
            successors: self.successors.into_iter().map(|(k, (id, _))| (k, id)).collect(),
            predecessors: self.predecessors.into_iter().map(|(k, (id, _))| (k, id)).collect(),
        }
    }

    fn index_entries(&mut self, index: usize, queue: &mut DiagnosticQueue) {
        let block = self.blocks[index];
        for label in block.entry_labels() {
            Self::index_label(&mut self.successors, label, block.id, "an entry", ErrorCode::E1003, queue);
        }
    }

    fn index_exits(&mut self, index: usize, queue: &mut DiagnosticQueue) {
        let block = self.blocks[index];
        for label in block.exit_labels() {
            Self::index_label(&mut self.predecessors, label, block.id, "an exit", ErrorCode::E1004, queue);
        }
    }

    fn index_label(
        map: &mut FxHashMap<Name, (BlockId, Span)>,
        label: &Ident,
        block: BlockId,
        role: &str,
        code: ErrorCode,
        queue: &mut DiagnosticQueue,
    ) {
        if let Some(&(_, first)) = map.get(&label.name) {
            queue.add(
                Diagnostic::error(code)
                    .with_message(format!("multiple definitions of `{label}` in {role} point"))
                    .with_label(label.span, "defined again here")
                    .with_secondary_label(first, "first defined here"),
            );
        } else {
            map.insert(label.name.clone(), (block, label.span));
        }
    }

    fn report_unmatched(&self, queue: &mut DiagnosticQueue) {
        let mut without_exit: Vec<(&Name, Span)> = self
            .successors
            .iter()
            .filter(|(label, _)| !self.predecessors.contains_key(*label))
            .map(|(label, &(_, span))| (label, span))
            .collect();
        without_exit.sort();
        for (label, span) in without_exit {
            queue.add(
                Diagnostic::error(ErrorCode::E1005)
                    .with_message(format!("label `{label}` has no associated exit point"))
                    .with_label(span, "nothing jumps to this entry point"),
            );
        }

        let mut without_entry: Vec<(&Name, Span)> = self
            .predecessors
            .iter()
            .filter(|(label, _)| !self.successors.contains_key(*label))
            .map(|(label, &(_, span))| (label, span))
            .collect();
        without_entry.sort();
        for (label, span) in without_entry {
            queue.add(
                Diagnostic::error(ErrorCode::E1006)
                    .with_message(format!("label `{label}` has no associated entry point"))
                    .with_label(span, "this exit point leads nowhere"),
            );
        }
    }
}
