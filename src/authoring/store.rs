// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation and captured-frame storage for the step being authored.

use crate::models::annotation::{Annotation, NewAnnotation};
use crate::models::frame::Frame;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Ordered annotations of the in-progress step.
///
/// Insertion order is preserved for display; ids are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationStore {
    items: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing list, e.g. when a saved step is reopened.
    pub fn from_vec(items: Vec<Annotation>) -> Self {
        Self { items }
    }

    /// Append an annotation and return its generated id.
    pub fn add(&mut self, new: NewAnnotation) -> Uuid {
        let label = match new.label {
            Some(label) if !label.trim().is_empty() => label,
            _ => format!(
                "Annotation {}",
                self.for_frame(new.frame_timestamp_ms).count() + 1
            ),
        };

        if !new.geometry.is_pixel_value && !new.geometry.is_within_unit_square() {
            log::warn!(
                "Annotation '{}' extends outside the frame: {:?}",
                label,
                new.geometry.rect
            );
        }

        let id = Uuid::new_v4();
        self.items.push(Annotation {
            id,
            label,
            frame_timestamp_ms: new.frame_timestamp_ms,
            geometry: new.geometry,
        });
        log::info!("Added annotation, total: {}", self.items.len());
        id
    }

    /// Remove the annotation with the given id.
    pub fn remove(&mut self, id: Uuid) -> Option<Annotation> {
        let idx = self.items.iter().position(|a| a.id == id)?;
        let removed = self.items.remove(idx);
        log::info!("Deleted annotation, total: {}", self.items.len());
        Some(removed)
    }

    /// Annotations drawn on the frame captured at exactly `timestamp_ms`.
    ///
    /// The iterator is lazy and can be cloned to walk the matches again.
    pub fn for_frame(&self, timestamp_ms: u64) -> ForFrame<'_> {
        ForFrame {
            inner: self.items.iter(),
            timestamp_ms,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn to_vec(&self) -> Vec<Annotation> {
        self.items.clone()
    }

    /// Swap in a whole list, returning the previous one (used by undo).
    pub fn replace_all(&mut self, items: Vec<Annotation>) -> Vec<Annotation> {
        std::mem::replace(&mut self.items, items)
    }
}

/// Iterator over the annotations of a single frame.
#[derive(Debug, Clone)]
pub struct ForFrame<'a> {
    inner: std::slice::Iter<'a, Annotation>,
    timestamp_ms: u64,
}

impl<'a> Iterator for ForFrame<'a> {
    type Item = &'a Annotation;

    fn next(&mut self) -> Option<Self::Item> {
        let ts = self.timestamp_ms;
        self.inner.find(|a| a.frame_timestamp_ms == ts)
    }
}

/// History system for undo/redo of annotation edits.
pub struct History {
    /// Undo stack (past states)
    undo_stack: Vec<Vec<Annotation>>,
    /// Redo stack (future states after undo)
    redo_stack: Vec<Vec<Annotation>>,
    /// Maximum history size
    max_size: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size: 50, // Keep last 50 states
        }
    }

    /// Save current state before making a change
    pub fn push(&mut self, annotations: Vec<Annotation>) {
        self.undo_stack.push(annotations);
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
        // A new edit invalidates the redo branch.
        self.redo_stack.clear();
    }

    /// Undo: restore previous state
    pub fn undo(&mut self, current: Vec<Annotation>) -> Option<Vec<Annotation>> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Redo: restore next state
    pub fn redo(&mut self, current: Vec<Annotation>) -> Option<Vec<Annotation>> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Captured frames keyed by timestamp, kept until the project is finalized.
#[derive(Debug, Clone, Default)]
pub struct FrameCache {
    frames: BTreeMap<u64, Frame>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a frame, replacing any earlier capture at the same timestamp.
    pub fn insert(&mut self, frame: Frame) {
        self.frames.insert(frame.timestamp_ms, frame);
    }

    pub fn get(&self, timestamp_ms: u64) -> Option<&Frame> {
        self.frames.get(&timestamp_ms)
    }

    /// Keep only frames whose timestamp satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(u64) -> bool) {
        self.frames.retain(|ts, _| keep(*ts));
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
