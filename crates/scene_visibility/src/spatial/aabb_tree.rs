//! Bounding volume tree spatial map
//!
//! Binary tree of AABBs stored in a flat node array. Two modes share the
//! same query code:
//!
//! - **Static**: changes only mark the tree stale; `finalize` rebuilds a
//!   balanced tree top-down (median split on the widest centroid axis) and
//!   the tree stays frozen until the next change.
//! - **Dynamic**: leaves are inserted incrementally, choosing the sibling
//!   with the lowest surface-area cost, and carry a fattened box so small
//!   movements do not restructure the tree.

use slotmap::SecondaryMap;

use crate::geometry::{is_fully_inside_planes_aabb, is_inside_planes_aabb, Plane, AABB};
use crate::scene::NodeKey;
use super::SpatialMap;

/// Sentinel index for "no node"
const NULL: usize = usize::MAX;

/// Maintenance strategy of an `AabbTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AabbTreeMode {
    /// Rebuilt on `finalize`, frozen in between
    Static,
    /// Incrementally maintained
    Dynamic,
}

/// Single node in the flat tree array
#[derive(Debug, Clone)]
struct TreeNode {
    /// Bounds of the subtree (fattened for dynamic leaves)
    bounds: AABB,
    parent: usize,
    children: [usize; 2],
    /// Entry index for leaves, NULL for branches
    entry: usize,
    /// Leaves are 0
    height: usize,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.entry != NULL
    }
}

/// Registered scene node
#[derive(Debug, Clone)]
struct Entry {
    node: NodeKey,
    extents: AABB,
    leaf: usize,
}

/// AABB tree implementing `SpatialMap`
#[derive(Debug)]
pub struct AabbTree {
    mode: AabbTreeMode,
    /// Fattening margin for dynamic leaves
    margin: f32,
    nodes: Vec<TreeNode>,
    free_nodes: Vec<usize>,
    root: usize,
    entries: Vec<Entry>,
    /// Scene node -> entry index
    lookup: SecondaryMap<NodeKey, usize>,
    /// Static mode: the tree no longer matches `entries`
    needs_rebuild: bool,
    extents: Option<AABB>,
    extents_dirty: bool,
    /// Scratch permutation reused by static rebuilds
    build_order: Vec<usize>,
}

impl AabbTree {
    /// Create an empty tree
    pub fn new(mode: AabbTreeMode, margin: f32) -> Self {
        Self {
            mode,
            margin: if mode == AabbTreeMode::Dynamic { margin } else { 0.0 },
            nodes: Vec::new(),
            free_nodes: Vec::new(),
            root: NULL,
            entries: Vec::new(),
            lookup: SecondaryMap::new(),
            needs_rebuild: false,
            extents: None,
            extents_dirty: false,
            build_order: Vec::new(),
        }
    }
    
    /// Create a static (rebuild-on-finalize) tree
    pub fn new_static() -> Self {
        Self::new(AabbTreeMode::Static, 0.0)
    }
    
    /// Create a dynamic tree with the given leaf fattening margin
    pub fn new_dynamic(margin: f32) -> Self {
        Self::new(AabbTreeMode::Dynamic, margin)
    }
    
    /// Maintenance mode of this tree
    pub fn mode(&self) -> AabbTreeMode {
        self.mode
    }
    
    /// Height of the tree (0 when empty, 1 for a single leaf)
    pub fn height(&self) -> usize {
        if self.root == NULL {
            0
        } else {
            self.nodes[self.root].height + 1
        }
    }
    
    fn alloc_node(&mut self, node: TreeNode) -> usize {
        if let Some(index) = self.free_nodes.pop() {
            self.nodes[index] = node;
            index
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }
    
    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        let children = &mut self.nodes[parent].children;
        if children[0] == old {
            children[0] = new;
        } else {
            children[1] = new;
        }
    }
    
    /// Recompute bounds and height of a branch from its children
    fn refresh(&mut self, index: usize) {
        let [a, b] = self.nodes[index].children;
        let bounds = self.nodes[a].bounds.union(&self.nodes[b].bounds);
        let height = 1 + self.nodes[a].height.max(self.nodes[b].height);
        let node = &mut self.nodes[index];
        node.bounds = bounds;
        node.height = height;
    }
    
    /// Rebalance and refit branches from `index` up to the root
    fn refit(&mut self, mut index: usize) {
        while index != NULL {
            index = self.balance(index);
            self.refresh(index);
            index = self.nodes[index].parent;
        }
    }
    
    /// Rotate the taller child of `a` above it when the children differ
    /// in height by more than one. Returns the node now at `a`'s position.
    fn balance(&mut self, a: usize) -> usize {
        if self.nodes[a].is_leaf() {
            return a;
        }
        
        let [b, c] = self.nodes[a].children;
        let (b_height, c_height) = (self.nodes[b].height, self.nodes[c].height);
        if c_height > b_height + 1 {
            self.rotate_up(a, 1)
        } else if b_height > c_height + 1 {
            self.rotate_up(a, 0)
        } else {
            a
        }
    }
    
    /// Lift `a`'s child on `side` into `a`'s place. The lifted node keeps
    /// its taller child and hands the shorter one down to `a`.
    fn rotate_up(&mut self, a: usize, side: usize) -> usize {
        let lifted = self.nodes[a].children[side];
        let [f, g] = self.nodes[lifted].children;
        let (keep, give) = if self.nodes[f].height > self.nodes[g].height { (f, g) } else { (g, f) };
        
        // Swap places with the parent
        let parent = self.nodes[a].parent;
        self.nodes[lifted].parent = parent;
        self.nodes[a].parent = lifted;
        if parent == NULL {
            self.root = lifted;
        } else {
            self.replace_child(parent, a, lifted);
        }
        
        self.nodes[lifted].children = [a, keep];
        self.nodes[a].children[side] = give;
        self.nodes[give].parent = a;
        
        self.refresh(a);
        self.refresh(lifted);
        lifted
    }
    
    /// Cost of descending into `child` to place a leaf with `bounds`
    fn descend_cost(&self, child: usize, bounds: &AABB) -> f32 {
        let node = &self.nodes[child];
        let union_area = node.bounds.union(bounds).surface_area();
        if node.is_leaf() {
            union_area
        } else {
            union_area - node.bounds.surface_area()
        }
    }
    
    fn insert_leaf(&mut self, leaf: usize) {
        self.nodes[leaf].height = 0;
        if self.root == NULL {
            self.root = leaf;
            self.nodes[leaf].parent = NULL;
            return;
        }
        
        // Walk down towards the cheapest sibling
        let leaf_bounds = self.nodes[leaf].bounds;
        let mut index = self.root;
        while !self.nodes[index].is_leaf() {
            let node = &self.nodes[index];
            let [c0, c1] = node.children;
            let area = node.bounds.surface_area();
            let combined_area = node.bounds.union(&leaf_bounds).surface_area();
            
            let cost = 2.0 * combined_area;
            let inheritance = 2.0 * (combined_area - area);
            let cost0 = self.descend_cost(c0, &leaf_bounds) + inheritance;
            let cost1 = self.descend_cost(c1, &leaf_bounds) + inheritance;
            
            if cost < cost0 && cost < cost1 {
                break;
            }
            index = if cost0 < cost1 { c0 } else { c1 };
        }
        
        let sibling = index;
        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.alloc_node(TreeNode {
            bounds: leaf_bounds.union(&self.nodes[sibling].bounds),
            parent: old_parent,
            children: [sibling, leaf],
            entry: NULL,
            height: self.nodes[sibling].height + 1,
        });
        self.nodes[sibling].parent = new_parent;
        self.nodes[leaf].parent = new_parent;
        
        if old_parent == NULL {
            self.root = new_parent;
        } else {
            self.replace_child(old_parent, sibling, new_parent);
        }
        // The sibling may be a tall branch, so balancing starts at the new parent
        self.refit(new_parent);
    }
    
    fn remove_leaf(&mut self, leaf: usize) {
        if leaf == self.root {
            self.root = NULL;
            return;
        }
        
        let parent = self.nodes[leaf].parent;
        let grand_parent = self.nodes[parent].parent;
        let [a, b] = self.nodes[parent].children;
        let sibling = if a == leaf { b } else { a };
        
        if grand_parent == NULL {
            self.root = sibling;
            self.nodes[sibling].parent = NULL;
        } else {
            self.replace_child(grand_parent, parent, sibling);
            self.nodes[sibling].parent = grand_parent;
            self.refit(grand_parent);
        }
        
        self.free_nodes.push(parent);
        self.nodes[leaf].parent = NULL;
    }
    
    /// Rebuild the whole tree from `entries` (static mode)
    fn rebuild(&mut self) {
        self.nodes.clear();
        self.free_nodes.clear();
        self.root = NULL;
        
        let mut order = std::mem::take(&mut self.build_order);
        order.clear();
        order.extend(0..self.entries.len());
        if !order.is_empty() {
            self.root = self.build_range(&mut order, NULL);
        }
        self.build_order = order;
        
        log::debug!(
            "Static spatial map rebuilt: {} entries, height {}",
            self.entries.len(),
            self.height()
        );
    }
    
    fn build_range(&mut self, items: &mut [usize], parent: usize) -> usize {
        if let [single] = items {
            let entry = *single;
            let leaf = self.alloc_node(TreeNode {
                bounds: self.entries[entry].extents,
                parent,
                children: [NULL, NULL],
                entry,
                height: 0,
            });
            self.entries[entry].leaf = leaf;
            return leaf;
        }
        
        let entries = &self.entries;
        let mut bounds = entries[items[0]].extents;
        let mut centroids = AABB::new(bounds.center(), bounds.center());
        for &item in items.iter().skip(1) {
            bounds.grow(&entries[item].extents);
            centroids.grow_point(entries[item].extents.center());
        }
        
        let size = centroids.max - centroids.min;
        let axis = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };
        items.sort_unstable_by(|&a, &b| {
            entries[a].extents.center()[axis].total_cmp(&entries[b].extents.center()[axis])
        });
        
        let index = self.alloc_node(TreeNode {
            bounds,
            parent,
            children: [NULL, NULL],
            entry: NULL,
            height: 0,
        });
        let (left_items, right_items) = items.split_at_mut(items.len() / 2);
        let left = self.build_range(left_items, index);
        let right = self.build_range(right_items, index);
        self.nodes[index].children = [left, right];
        self.nodes[index].height = 1 + self.nodes[left].height.max(self.nodes[right].height);
        index
    }
    
    /// Traversal stack sized for a balanced tree
    fn traversal_stack(&self) -> Vec<usize> {
        let mut stack = Vec::with_capacity(2 * self.height() + 2);
        if self.root != NULL {
            stack.push(self.root);
        }
        stack
    }
    
    fn collect_all(&self, index: usize, out: &mut Vec<NodeKey>) {
        let mut stack = vec![index];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.is_leaf() {
                out.push(self.entries[node.entry].node);
            } else {
                stack.extend_from_slice(&node.children);
            }
        }
    }
    
    fn collect_visible(&self, planes: &[Plane], out: &mut Vec<NodeKey>) {
        let mut stack = self.traversal_stack();
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !is_inside_planes_aabb(&node.bounds, planes) {
                continue;
            }
            
            if node.is_leaf() {
                let entry = &self.entries[node.entry];
                if is_inside_planes_aabb(&entry.extents, planes) {
                    out.push(entry.node);
                }
            } else if is_fully_inside_planes_aabb(&node.bounds, planes) {
                self.collect_all(index, out);
            } else {
                stack.extend_from_slice(&node.children);
            }
        }
    }
    
    fn collect_overlapping(&self, extents: &AABB, out: &mut Vec<NodeKey>) {
        let mut stack = self.traversal_stack();
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.bounds.intersects(extents) {
                continue;
            }
            
            if node.is_leaf() {
                let entry = &self.entries[node.entry];
                if entry.extents.intersects(extents) {
                    out.push(entry.node);
                }
            } else if extents.contains(&node.bounds) {
                self.collect_all(index, out);
            } else {
                stack.extend_from_slice(&node.children);
            }
        }
    }
}

impl SpatialMap for AabbTree {
    fn add(&mut self, node: NodeKey, extents: &AABB) {
        debug_assert!(!self.lookup.contains_key(node), "node registered twice");
        if self.lookup.contains_key(node) {
            self.update(node, extents);
            return;
        }
        
        let index = self.entries.len();
        self.entries.push(Entry { node, extents: *extents, leaf: NULL });
        self.lookup.insert(node, index);
        self.extents_dirty = true;
        
        match self.mode {
            AabbTreeMode::Static => self.needs_rebuild = true,
            AabbTreeMode::Dynamic => {
                let leaf = self.alloc_node(TreeNode {
                    bounds: extents.expanded(self.margin),
                    parent: NULL,
                    children: [NULL, NULL],
                    entry: index,
                    height: 0,
                });
                self.entries[index].leaf = leaf;
                self.insert_leaf(leaf);
            }
        }
    }
    
    fn update(&mut self, node: NodeKey, extents: &AABB) {
        let Some(&index) = self.lookup.get(node) else {
            return;
        };
        self.entries[index].extents = *extents;
        self.extents_dirty = true;
        
        match self.mode {
            AabbTreeMode::Static => self.needs_rebuild = true,
            AabbTreeMode::Dynamic => {
                let leaf = self.entries[index].leaf;
                if !self.nodes[leaf].bounds.contains(extents) {
                    self.remove_leaf(leaf);
                    self.nodes[leaf].bounds = extents.expanded(self.margin);
                    self.insert_leaf(leaf);
                }
            }
        }
    }
    
    fn remove(&mut self, node: NodeKey) {
        let Some(index) = self.lookup.remove(node) else {
            return;
        };
        
        match self.mode {
            AabbTreeMode::Static => self.needs_rebuild = true,
            AabbTreeMode::Dynamic => {
                let leaf = self.entries[index].leaf;
                self.remove_leaf(leaf);
                self.free_nodes.push(leaf);
            }
        }
        
        self.entries.swap_remove(index);
        if index < self.entries.len() {
            let moved = self.entries[index].node;
            self.lookup.insert(moved, index);
            if self.mode == AabbTreeMode::Dynamic {
                let leaf = self.entries[index].leaf;
                self.nodes[leaf].entry = index;
            }
        }
        self.extents_dirty = true;
    }
    
    fn finalize(&mut self) {
        if self.needs_rebuild {
            self.rebuild();
            self.needs_rebuild = false;
        }
        if self.extents_dirty {
            self.extents = self
                .entries
                .iter()
                .map(|entry| entry.extents)
                .reduce(|a, b| a.union(&b));
            self.extents_dirty = false;
        }
    }
    
    fn get_visible_nodes(&self, planes: &[Plane], out: &mut Vec<NodeKey>) -> usize {
        let start = out.len();
        if self.needs_rebuild {
            // Stale static tree: answer from the entry list until finalize
            out.extend(
                self.entries
                    .iter()
                    .filter(|entry| is_inside_planes_aabb(&entry.extents, planes))
                    .map(|entry| entry.node),
            );
        } else {
            self.collect_visible(planes, out);
        }
        out.len() - start
    }
    
    fn get_overlapping_nodes(&self, extents: &AABB, out: &mut Vec<NodeKey>) -> usize {
        let start = out.len();
        if self.needs_rebuild {
            out.extend(
                self.entries
                    .iter()
                    .filter(|entry| entry.extents.intersects(extents))
                    .map(|entry| entry.node),
            );
        } else {
            self.collect_overlapping(extents, out);
        }
        out.len() - start
    }
    
    fn get_extents(&self) -> Option<AABB> {
        self.extents
    }
    
    fn contains(&self, node: NodeKey) -> bool {
        self.lookup.contains_key(node)
    }
    
    fn len(&self) -> usize {
        self.entries.len()
    }
    
    fn clear(&mut self) {
        self.nodes.clear();
        self.free_nodes.clear();
        self.root = NULL;
        self.entries.clear();
        self.lookup.clear();
        self.needs_rebuild = false;
        self.extents = None;
        self.extents_dirty = false;
    }
}
