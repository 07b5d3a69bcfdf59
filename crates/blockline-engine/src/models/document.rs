use std::collections::HashMap;

use crate::models::{BlockId, BlockRole, BlockStore, StoreError, TextBuffer};

/// Line between hub sections in a rendered outline
pub const HUB_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq)]
struct Node {
    role: BlockRole,
    parent: Option<BlockId>,
    children: Vec<BlockId>,
    text: Option<TextBuffer>,
}

/// In-memory block tree with one text buffer per content block.
///
/// Cloning is cheap enough for checkpoints: node maps are small and the rope
/// buffers share their storage.
#[derive(Debug, Clone)]
pub struct Document {
    root: BlockId,
    nodes: HashMap<BlockId, Node>,
    /// Incremented on every committed change
    version: u64,
}

/// Snapshot of a document's nodes taken at the start of a transaction
pub struct DocumentCheckpoint {
    nodes: HashMap<BlockId, Node>,
    version: u64,
}

impl Document {
    pub fn new() -> Self {
        let root = BlockId::generate();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                role: BlockRole::Root,
                parent: None,
                children: Vec::new(),
                text: None,
            },
        );
        Self {
            root,
            nodes,
            version: 0,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of blocks, root included
    pub fn block_count(&self) -> usize {
        self.nodes.len()
    }

    /// Append a new block as the last child of `parent`.
    ///
    /// Only content blocks keep `text`; it is dropped for other roles.
    pub fn append_block(
        &mut self,
        parent: BlockId,
        role: BlockRole,
        text: Option<&str>,
    ) -> Result<BlockId, StoreError> {
        let id = BlockId::generate();
        if role == BlockRole::Root {
            return Err(StoreError::InvalidReparent {
                block: id,
                target: parent,
            });
        }
        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or(StoreError::BlockNotFound(parent))?;
        parent_node.children.push(id);

        let text = match role {
            BlockRole::Content => text.map(TextBuffer::from),
            _ => None,
        };
        self.nodes.insert(
            id,
            Node {
                role,
                parent: Some(parent),
                children: Vec::new(),
                text,
            },
        );
        self.version += 1;
        Ok(id)
    }

    /// Append a hub under the root
    pub fn append_hub(&mut self) -> BlockId {
        let root = self.root;
        let id = BlockId::generate();
        if let Some(node) = self.nodes.get_mut(&root) {
            node.children.push(id);
        }
        self.nodes.insert(
            id,
            Node {
                role: BlockRole::Hub,
                parent: Some(root),
                children: Vec::new(),
                text: None,
            },
        );
        self.version += 1;
        id
    }

    pub fn append_text_block(&mut self, parent: BlockId, text: &str) -> Result<BlockId, StoreError> {
        self.append_block(parent, BlockRole::Content, Some(text))
    }

    pub fn text_of(&self, id: BlockId) -> Option<String> {
        self.text(id).map(TextBuffer::text)
    }

    /// Text-bearing blocks in document order
    pub fn text_blocks(&self) -> Vec<BlockId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.text(*id).is_some())
            .collect()
    }

    /// Render the tree as a nested bullet list, hubs separated by a rule
    pub fn to_outline(&self) -> String {
        let mut sections = Vec::new();
        for top in self.children(self.root) {
            let mut lines = Vec::new();
            if self.role(*top) == Some(BlockRole::Hub) {
                for child in self.children(*top) {
                    self.render_item(*child, 0, &mut lines);
                }
            } else {
                self.render_item(*top, 0, &mut lines);
            }
            if !lines.is_empty() {
                sections.push(lines.join("\n"));
            }
        }
        sections.join(HUB_SEPARATOR)
    }

    fn render_item(&self, id: BlockId, depth: usize, lines: &mut Vec<String>) {
        let text = self.text_of(id).unwrap_or_default();
        let line = format!("{}- {}", "  ".repeat(depth), text);
        lines.push(line.trim_end().to_string());
        for child in self.children(id) {
            self.render_item(*child, depth + 1, lines);
        }
    }

    fn buffer_mut(&mut self, id: BlockId) -> Result<&mut TextBuffer, StoreError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(StoreError::BlockNotFound(id))?;
        node.text.as_mut().ok_or(StoreError::NotTextBearing(id))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for Document {
    type Checkpoint = DocumentCheckpoint;

    fn root(&self) -> BlockId {
        self.root
    }

    fn contains(&self, id: BlockId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    fn children(&self, id: BlockId) -> &[BlockId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    fn role(&self, id: BlockId) -> Option<BlockRole> {
        self.nodes.get(&id).map(|node| node.role)
    }

    fn text(&self, id: BlockId) -> Option<&TextBuffer> {
        self.nodes.get(&id).and_then(|node| node.text.as_ref())
    }

    fn insert_text(&mut self, id: BlockId, index: usize, text: &str) -> Result<(), StoreError> {
        self.buffer_mut(id)?.insert(index, text)
    }

    fn delete_text(
        &mut self,
        id: BlockId,
        index: usize,
        length: usize,
    ) -> Result<(), StoreError> {
        self.buffer_mut(id)?.delete(index, length)
    }

    fn join_text(&mut self, target: BlockId, source: BlockId) -> Result<(), StoreError> {
        let tail = match self.nodes.get(&source) {
            Some(node) => node.text.clone().ok_or(StoreError::NotTextBearing(source))?,
            None => return Err(StoreError::BlockNotFound(source)),
        };
        self.buffer_mut(target)?.join(&tail);
        Ok(())
    }

    fn remove_block(&mut self, id: BlockId, reparent_to: BlockId) -> Result<(), StoreError> {
        if id == self.root {
            return Err(StoreError::RootRemoval);
        }
        let node = self
            .nodes
            .get(&id)
            .cloned()
            .ok_or(StoreError::BlockNotFound(id))?;
        if !self.contains(reparent_to) {
            return Err(StoreError::BlockNotFound(reparent_to));
        }
        // The target has to survive the removal
        if self.descendants(id).contains(&reparent_to) {
            return Err(StoreError::InvalidReparent {
                block: id,
                target: reparent_to,
            });
        }

        let position = node.parent.and_then(|parent| {
            let siblings = &mut self.nodes.get_mut(&parent)?.children;
            let position = siblings.iter().position(|child| *child == id)?;
            siblings.remove(position);
            Some(position)
        });

        for child in &node.children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = Some(reparent_to);
            }
        }
        if let Some(target) = self.nodes.get_mut(&reparent_to) {
            match position {
                // Children take the removed block's place among its siblings
                Some(position) if node.parent == Some(reparent_to) => {
                    target
                        .children
                        .splice(position..position, node.children.iter().copied());
                }
                _ => target.children.extend(node.children.iter().copied()),
            }
        }

        self.nodes.remove(&id);
        Ok(())
    }

    fn checkpoint(&self) -> DocumentCheckpoint {
        DocumentCheckpoint {
            nodes: self.nodes.clone(),
            version: self.version,
        }
    }

    fn restore(&mut self, checkpoint: DocumentCheckpoint) {
        self.nodes = checkpoint.nodes;
        self.version = checkpoint.version;
    }

    fn commit(&mut self) {
        self.version += 1;
    }
}
