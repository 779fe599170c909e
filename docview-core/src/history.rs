//! Linear undo/redo over reversible commands.

use crate::annotation::{Annotation, AnnotationId};
use crate::error::{ViewerError, ViewerResult};
use crate::DocumentMetadata;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddAnnotation {
        page_index: usize,
        id: AnnotationId,
        position: usize,
        annotation: Annotation,
    },
    RemoveAnnotation {
        page_index: usize,
        id: AnnotationId,
        position: usize,
        annotation: Annotation,
    },
    RotatePage {
        page_index: usize,
        degrees: i32,
    },
    SetMetadata {
        old: DocumentMetadata,
        new: DocumentMetadata,
    },
}

impl Command {
    pub fn inverse(&self) -> Command {
        match self.clone() {
            Command::AddAnnotation {
                page_index,
                id,
                position,
                annotation,
            } => Command::RemoveAnnotation {
                page_index,
                id,
                position,
                annotation,
            },
            Command::RemoveAnnotation {
                page_index,
                id,
                position,
                annotation,
            } => Command::AddAnnotation {
                page_index,
                id,
                position,
                annotation,
            },
            Command::RotatePage {
                page_index,
                degrees,
            } => Command::RotatePage {
                page_index,
                degrees: (360 - degrees.rem_euclid(360)) % 360,
            },
            Command::SetMetadata { old, new } => Command::SetMetadata { old: new, new: old },
        }
    }
}

#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, command: Command) {
        self.undo_stack.push(command);
        self.redo_stack.clear();
    }

    /// Applies the inverse of the most recent command through `apply`. The
    /// stacks only move once `apply` has succeeded.
    pub fn undo<F>(&mut self, apply: F) -> ViewerResult<Command>
    where
        F: FnOnce(&Command) -> ViewerResult<()>,
    {
        let command = self
            .undo_stack
            .last()
            .ok_or(ViewerError::EmptyHistory("undo"))?;
        apply(&command.inverse())?;
        let command = self
            .undo_stack
            .pop()
            .ok_or(ViewerError::EmptyHistory("undo"))?;
        self.redo_stack.push(command.clone());
        Ok(command)
    }

    /// Re-applies the most recently undone command through `apply`.
    pub fn redo<F>(&mut self, apply: F) -> ViewerResult<Command>
    where
        F: FnOnce(&Command) -> ViewerResult<()>,
    {
        let command = self
            .redo_stack
            .last()
            .ok_or(ViewerError::EmptyHistory("redo"))?;
        apply(command)?;
        let command = self
            .redo_stack
            .pop()
            .ok_or(ViewerError::EmptyHistory("redo"))?;
        self.undo_stack.push(command.clone());
        Ok(command)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }
}
