use std::path::Path;

use tracing::{debug, info, warn};

use crate::{
    Attributes, Context, Diagnostics, DiagramWriter, DirectoryWriter, Error, PrepareFailure,
    PrepareMode, SampleMatrix, SeqDiagram, MAX_TREE_DEPTH, SEQDIAG_GROUP,
};

mod atomic;
mod concat;
mod description;

pub use atomic::{AtomicSequence, NonLinGradGuard};
pub use concat::ConcatSequence;
pub use description::{
    AtomicDescription, ConcatDescription, GenericPulseDescription, NodeDescription,
    PulseDescription, SequenceDescription, TrapGradDescription,
};

const AUX_ATTRIBUTES: [&str; 3] = ["Aux1", "Aux2", "Aux3"];

/// Where a node sits in the tree during a recursive pass.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    depth: usize,
}

impl Position {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn depth(self) -> usize {
        self.depth
    }

    pub fn is_root(self) -> bool {
        self.depth == 0
    }

    pub fn child(self) -> Self {
        Self {
            depth: self.depth + 1,
        }
    }
}

/// Running write position of `collect_seq_data`. Only atomic blocks move it.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub(crate) struct Cursor {
    /// Start time of the next block. Unit: `ms`
    pub time: f64,
    /// Number of time points already written, not counting the sentinel row
    pub offset: usize,
}

impl Cursor {
    pub fn advance(&mut self, duration: f64, num_tpois: usize) {
        self.time += duration;
        self.offset += num_tpois;
    }
}

/// A node of the sequence tree.
#[derive(Debug, Clone)]
pub enum Sequence {
    Concat(ConcatSequence),
    Atomic(AtomicSequence),
}

impl From<ConcatSequence> for Sequence {
    fn from(value: ConcatSequence) -> Self {
        Self::Concat(value)
    }
}

impl From<AtomicSequence> for Sequence {
    fn from(value: AtomicSequence) -> Self {
        Self::Atomic(value)
    }
}

impl Sequence {
    pub fn name(&self) -> &str {
        match self {
            Sequence::Concat(seq) => seq.name(),
            Sequence::Atomic(seq) => seq.name(),
        }
    }

    /// Only valid after a successful `prepare`. Unit: `ms`
    pub fn duration(&self) -> f64 {
        match self {
            Sequence::Concat(seq) => seq.duration(),
            Sequence::Atomic(seq) => seq.duration(),
        }
    }

    /// Number of time points this node contributes to a sequence diagram.
    pub fn num_tpois(&self) -> usize {
        match self {
            Sequence::Concat(seq) => seq.num_tpois(),
            Sequence::Atomic(seq) => seq.num_tpois(),
        }
    }

    pub fn num_adcs(&self) -> usize {
        match self {
            Sequence::Concat(seq) => seq.num_adcs(),
            Sequence::Atomic(seq) => seq.num_adcs(),
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Sequence::Concat(seq) => seq.attributes(),
            Sequence::Atomic(seq) => seq.attributes(),
        }
    }

    pub fn set_attribute(&mut self, name: &str, value: f64) -> Result<(), Error> {
        match self {
            Sequence::Concat(seq) => seq.set_attribute(name, value),
            Sequence::Atomic(seq) => seq.set_attribute(name, value),
        }
    }

    pub fn children(&self) -> &[Sequence] {
        match self {
            Sequence::Concat(seq) => seq.children(),
            Sequence::Atomic(_) => &[],
        }
    }

    /// Prepares this node and everything below it. Returns false if any node
    /// failed, all failures are collected in `diag`.
    pub(crate) fn prepare(&mut self, pos: Position, ctx: &Context, diag: &mut Diagnostics) -> bool {
        let ok = match self {
            Sequence::Concat(seq) => seq.prepare(pos, ctx, diag),
            Sequence::Atomic(seq) => seq.prepare(ctx, diag),
        };
        if !ok && pos.is_root() && diag.is_verbose() {
            warn!("preparation of sequence {} failed", self.name());
        }
        ok
    }

    /// Samples every atomic block below this node into `matrix`, starting at
    /// `cursor`. The cursor ends up after the last block.
    pub(crate) fn collect_seq_data(&self, matrix: &mut SampleMatrix, cursor: &mut Cursor) {
        match self {
            Sequence::Concat(seq) => seq.collect_seq_data(matrix, cursor),
            Sequence::Atomic(seq) => seq.collect_seq_data(matrix, cursor),
        }
    }

    pub fn info(&self) -> String {
        match self {
            Sequence::Concat(seq) => seq.info(),
            Sequence::Atomic(seq) => seq.info(),
        }
    }

    /// Sets an attribute on the first sequence or pulse named `node`.
    /// Returns `None` if there is no such node below this one.
    fn set_named_attribute(
        &mut self,
        node: &str,
        attribute: &str,
        value: f64,
    ) -> Option<Result<(), Error>> {
        if self.name() == node {
            return Some(self.set_attribute(attribute, value));
        }
        match self {
            Sequence::Atomic(seq) if seq.pulse().name() == node => {
                Some(seq.pulse_mut().set_attribute(attribute, value))
            }
            Sequence::Atomic(_) => None,
            Sequence::Concat(seq) => seq
                .children_mut()
                .iter_mut()
                .find_map(|child| child.set_named_attribute(node, attribute, value)),
        }
    }

    fn write_info(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{indent}{}\n", self.info()));
        match self {
            Sequence::Concat(seq) => {
                for child in seq.children() {
                    child.write_info(depth + 1, out);
                }
            }
            Sequence::Atomic(seq) => {
                out.push_str(&format!("{indent}  {}\n", seq.pulse().info()));
            }
        }
    }
}

/// Nesting depth of the tree below `root`, the root itself being level 1.
fn tree_depth(root: &Sequence) -> usize {
    let mut max_depth = 0;
    let mut stack = vec![(root, 1)];
    while let Some((node, depth)) = stack.pop() {
        max_depth = max_depth.max(depth);
        stack.extend(node.children().iter().map(|child| (child, depth + 1)));
    }
    max_depth
}

/// A sequence tree together with the settings it is prepared with.
#[derive(Debug, Clone)]
pub struct SequenceTree {
    root: Sequence,
    context: Context,
    prepared: bool,
}

impl SequenceTree {
    /// Fails if the tree is deeper than `MAX_TREE_DEPTH`.
    pub fn new(root: impl Into<Sequence>, context: Context) -> Result<Self, Error> {
        let root = root.into();
        let depth = tree_depth(&root);
        if depth > MAX_TREE_DEPTH {
            return Err(Error::TreeTooDeep {
                depth,
                limit: MAX_TREE_DEPTH,
            });
        }
        Ok(Self {
            root,
            context,
            prepared: false,
        })
    }

    pub fn from_description(description: SequenceDescription) -> Result<Self, Error> {
        let root = description.sequence.build()?;
        Self::new(root, description.parameters)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        Self::from_description(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn root(&self) -> &Sequence {
        &self.root
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Replacing the settings requires a new `prepare`.
    pub fn set_context(&mut self, context: Context) {
        self.context = context;
        self.prepared = false;
    }

    /// True if the last `prepare` succeeded and nothing changed since.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Prepares the whole tree. Every node is visited even after a failure,
    /// so the error lists all problems of the tree.
    pub fn prepare(&mut self, mode: PrepareMode) -> Result<(), PrepareFailure> {
        let mut diag = Diagnostics::new(mode);
        let ok = self.root.prepare(Position::root(), &self.context, &mut diag);
        self.prepared = ok;
        debug!(
            "prepared {} ({mode:?}): ok = {ok}, duration = {}",
            self.root.name(),
            self.root.duration()
        );

        if ok {
            Ok(())
        } else {
            Err(PrepareFailure {
                sequence: self.root.name().to_owned(),
                errors: diag.into_errors(),
            })
        }
    }

    pub fn duration(&self) -> f64 {
        self.root.duration()
    }

    pub fn num_tpois(&self) -> usize {
        self.root.num_tpois()
    }

    pub fn num_adcs(&self) -> usize {
        self.root.num_adcs()
    }

    /// Sets `attribute` of the sequence or pulse named `node`. The tree has to
    /// be prepared again afterwards.
    pub fn set_attribute(&mut self, node: &str, attribute: &str, value: f64) -> Result<(), Error> {
        let result = self
            .root
            .set_named_attribute(node, attribute, value)
            .ok_or_else(|| Error::UnknownNode(node.to_owned()))?;
        self.prepared = false;
        result
    }

    /// One line per node, indented by depth.
    pub fn info(&self) -> String {
        let mut out = String::new();
        self.root.write_info(0, &mut out);
        out
    }

    /// Flattens the prepared tree into a sequence diagram.
    pub fn seq_diag(&self) -> Result<SeqDiagram, Error> {
        if !self.prepared {
            return Err(Error::NotPrepared);
        }
        let num_tpois = self.num_tpois();
        let mut matrix = SampleMatrix::new(num_tpois);
        let mut cursor = Cursor::default();
        self.root.collect_seq_data(&mut matrix, &mut cursor);
        debug_assert_eq!(cursor.offset, num_tpois);

        Ok(SeqDiagram::from_axis_major(&matrix.into_axis_major()))
    }

    /// Computes the diagram and writes all datasets to `SEQDIAG_GROUP`.
    pub fn write_seq_diag<W: DiagramWriter>(&self, writer: &mut W) -> Result<SeqDiagram, Error> {
        let diagram = self.seq_diag()?;
        for (urn, data) in diagram.datasets() {
            writer.write(data, urn, SEQDIAG_GROUP)?;
        }
        Ok(diagram)
    }

    /// Exports the diagram as raw files below `path`, see `DirectoryWriter`.
    pub fn seq_diag_to_dir(&self, path: impl AsRef<Path>) -> Result<SeqDiagram, Error> {
        if !self.prepared {
            return Err(Error::NotPrepared);
        }
        let mut writer = DirectoryWriter::create(path)?;
        let diagram = self.write_seq_diag(&mut writer)?;
        info!(
            "wrote sequence diagram of {}: {} samples, {} ADCs, {} ms to {}",
            self.root.name(),
            diagram.len(),
            diagram.num_adcs(),
            self.duration(),
            writer.root().display()
        );
        Ok(diagram)
    }
}
