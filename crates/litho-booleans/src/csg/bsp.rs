//! Binary space partitioning tree over convex polygons.
//!
//! Nodes live in a [`SlotMap`] arena. Building and clipping walk the tree
//! with explicit work stacks, so deep trees from large heightfield meshes do
//! not recurse.

use std::mem;

use slotmap::{new_key_type, SlotMap};

use super::polygon::{Plane, Polygon, Split};

new_key_type! {
    /// Handle to a node in a [`BspTree`].
    pub struct NodeId;
}

#[derive(Debug, Default)]
struct Node {
    plane: Option<Plane>,
    polygons: Vec<Polygon>,
    front: Option<NodeId>,
    back: Option<NodeId>,
}

/// Solid described by the polygons of its boundary. Space behind every
/// polygon is inside.
#[derive(Debug)]
pub struct BspTree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
}

impl BspTree {
    /// Tree over `polygons`.
    pub fn new(polygons: Vec<Polygon>) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::default());
        let mut tree = Self { nodes, root };
        tree.build(polygons);
        tree
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Insert polygons, extending the existing partition.
    pub fn build(&mut self, polygons: Vec<Polygon>) {
        let mut work = vec![(self.root, polygons)];

        while let Some((id, polygons)) = work.pop() {
            if polygons.is_empty() {
                continue;
            }
            let node = &mut self.nodes[id];
            let plane = *node.plane.get_or_insert(polygons[0].plane);

            let mut front = Vec::new();
            let mut back = Vec::new();
            for polygon in polygons {
                match plane.split(polygon) {
                    Split::CoplanarFront(p) | Split::CoplanarBack(p) => node.polygons.push(p),
                    Split::Front(p) => front.push(p),
                    Split::Back(p) => back.push(p),
                    Split::Spanning { front: f, back: b } => {
                        front.extend(f);
                        back.extend(b);
                    }
                }
            }

            if !front.is_empty() {
                work.push((self.child(id, Child::Front), front));
            }
            if !back.is_empty() {
                work.push((self.child(id, Child::Back), back));
            }
        }
    }

    fn child(&mut self, id: NodeId, which: Child) -> NodeId {
        let existing = match which {
            Child::Front => self.nodes[id].front,
            Child::Back => self.nodes[id].back,
        };
        if let Some(child) = existing {
            return child;
        }
        let child = self.nodes.insert(Node::default());
        let node = &mut self.nodes[id];
        match which {
            Child::Front => node.front = Some(child),
            Child::Back => node.back = Some(child),
        }
        child
    }

    /// Swap inside and outside.
    pub fn invert(&mut self) {
        for node in self.nodes.values_mut() {
            for polygon in &mut node.polygons {
                polygon.flip();
            }
            if let Some(plane) = &mut node.plane {
                plane.flip();
            }
            mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Remove the parts of `polygons` that lie inside this solid.
    pub fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut kept = Vec::new();
        let mut work = vec![(self.root, polygons)];

        while let Some((id, polygons)) = work.pop() {
            let node = &self.nodes[id];
            let Some(plane) = node.plane else {
                kept.extend(polygons);
                continue;
            };

            let mut front = Vec::new();
            let mut back = Vec::new();
            for polygon in polygons {
                match plane.split(polygon) {
                    Split::CoplanarFront(p) | Split::Front(p) => front.push(p),
                    Split::CoplanarBack(p) | Split::Back(p) => back.push(p),
                    Split::Spanning { front: f, back: b } => {
                        front.extend(f);
                        back.extend(b);
                    }
                }
            }

            match node.front {
                Some(child) => work.push((child, front)),
                None => kept.extend(front),
            }
            // Behind a leaf plane is solid
            if let Some(child) = node.back {
                work.push((child, back));
            }
        }

        kept
    }

    /// Remove the parts of this tree's polygons that lie inside `other`.
    pub fn clip_to(&mut self, other: &BspTree) {
        for node in self.nodes.values_mut() {
            node.polygons = other.clip_polygons(mem::take(&mut node.polygons));
        }
    }

    /// Every polygon in the tree.
    pub fn all_polygons(&self) -> Vec<Polygon> {
        self.nodes
            .values()
            .flat_map(|node| node.polygons.iter().cloned())
            .collect()
    }

    /// Consume the tree, returning its polygons.
    pub fn into_polygons(self) -> Vec<Polygon> {
        self.nodes
            .into_iter()
            .flat_map(|(_, node)| node.polygons)
            .collect()
    }
}

#[derive(Clone, Copy)]
enum Child {
    Front,
    Back,
}
