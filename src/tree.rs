//! Organization tree arena
//!
//! Holds a set of organization rows keyed by id plus a parent -> children
//! index. Every structural derivation (level, full path, descendants, ...)
//! is computed here from the materialized rows instead of through chained
//! self-joins in SQL.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::entity::organization::{self, sibling_order};
use crate::error::{AppError, AppResult};

/// Separator used by [`OrganizationTree::full_path`]
pub const PATH_SEPARATOR: &str = " > ";

/// Nested view of an organization and its children
#[derive(Clone, Debug, Serialize)]
pub struct TreeNode {
    pub organization: organization::Model,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree, including self
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }
}

#[derive(Clone, Debug, Default)]
pub struct OrganizationTree {
    nodes: HashMap<Uuid, organization::Model>,
    children: HashMap<Uuid, Vec<Uuid>>,
    roots: Vec<Uuid>,
}

impl OrganizationTree {
    /// Builds the arena. Rows whose parent is not part of the set are
    /// treated as roots.
    pub fn from_models(models: impl IntoIterator<Item = organization::Model>) -> Self {
        let nodes: HashMap<Uuid, organization::Model> =
            models.into_iter().map(|m| (m.id, m)).collect();

        let mut tree = Self {
            nodes,
            children: HashMap::new(),
            roots: Vec::new(),
        };
        tree.reindex();
        tree
    }

    fn reindex(&mut self) {
        self.children.clear();
        self.roots.clear();

        for node in self.nodes.values() {
            match node.parent_id.filter(|p| self.nodes.contains_key(p)) {
                Some(parent_id) => self.children.entry(parent_id).or_default().push(node.id),
                None => self.roots.push(node.id),
            }
        }

        let nodes = &self.nodes;
        let by_order = |a: &Uuid, b: &Uuid| sibling_order(&nodes[a], &nodes[b]);
        self.roots.sort_by(by_order);
        for ids in self.children.values_mut() {
            ids.sort_by(by_order);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<&organization::Model> {
        self.nodes.get(&id)
    }

    pub fn parent(&self, id: Uuid) -> Option<&organization::Model> {
        self.get(id)?.parent_id.and_then(|p| self.get(p))
    }

    pub fn roots(&self) -> Vec<&organization::Model> {
        self.roots.iter().filter_map(|id| self.get(*id)).collect()
    }

    /// Direct children in sibling order
    pub fn children(&self, id: Uuid) -> Vec<&organization::Model> {
        self.children
            .get(&id)
            .map(|ids| ids.iter().filter_map(|c| self.get(*c)).collect())
            .unwrap_or_default()
    }

    /// Ancestors from the direct parent up to the root.
    ///
    /// Stops at the first repeated node, so corrupt parent chains terminate.
    pub fn ancestors(&self, id: Uuid) -> Vec<&organization::Model> {
        let mut seen = HashSet::from([id]);
        let mut out = Vec::new();
        let mut current = self.parent(id);

        while let Some(node) = current {
            if !seen.insert(node.id) {
                tracing::warn!("Cycle detected above organization {}", id);
                break;
            }
            out.push(node);
            current = self.parent(node.id);
        }

        out
    }

    /// Hops to the root; 0 for roots
    pub fn level(&self, id: Uuid) -> Option<usize> {
        self.get(id).map(|_| self.ancestors(id).len())
    }

    /// Root-to-self chain
    pub fn path(&self, id: Uuid) -> Vec<&organization::Model> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        let mut path = self.ancestors(id);
        path.reverse();
        path.push(node);
        path
    }

    /// Names from the root down to `id`, joined with `" > "`
    pub fn full_path(&self, id: Uuid) -> Option<String> {
        self.get(id)?;
        let names: Vec<&str> = self.path(id).iter().map(|m| m.name.as_str()).collect();
        Some(names.join(PATH_SEPARATOR))
    }

    pub fn is_root(&self, id: Uuid) -> bool {
        self.get(id).is_some_and(|_| self.parent(id).is_none())
    }

    pub fn is_leaf(&self, id: Uuid) -> bool {
        self.get(id).is_some() && self.children.get(&id).map_or(true, Vec::is_empty)
    }

    /// Every node below `id`, pre-order
    pub fn descendants(&self, id: Uuid) -> Vec<&organization::Model> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        self.collect_descendants(id, &mut seen, &mut out);
        out
    }

    fn collect_descendants<'a>(
        &'a self,
        id: Uuid,
        seen: &mut HashSet<Uuid>,
        out: &mut Vec<&'a organization::Model>,
    ) {
        for child in self.children(id) {
            if !seen.insert(child.id) {
                continue;
            }
            out.push(child);
            self.collect_descendants(child.id, seen, out);
        }
    }

    /// Whether `ancestor` appears on the parent chain of `descendant`
    pub fn is_ancestor(&self, ancestor: Uuid, descendant: Uuid) -> bool {
        self.ancestors(descendant).iter().any(|m| m.id == ancestor)
    }

    /// Re-parents `child` under `parent`, keeping both sides of the relation
    /// consistent.
    pub fn add_child(&mut self, parent: Uuid, child: Uuid) -> AppResult<()> {
        if !self.contains(parent) {
            return Err(AppError::NotFound(format!("Organization {parent}")));
        }
        if !self.contains(child) {
            return Err(AppError::NotFound(format!("Organization {child}")));
        }
        if parent == child {
            return Err(AppError::SelfParent);
        }
        if self.is_ancestor(child, parent) {
            return Err(AppError::CircularReference);
        }

        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent_id = Some(parent);
        }
        self.reindex();
        Ok(())
    }

    /// Detaches `child` from `parent`. The child's parent pointer is only
    /// cleared while it still points at `parent`.
    pub fn remove_child(&mut self, parent: Uuid, child: Uuid) -> bool {
        let listed = self
            .children
            .get(&parent)
            .is_some_and(|ids| ids.contains(&child));
        if !listed {
            return false;
        }

        if let Some(node) = self.nodes.get_mut(&child) {
            if node.parent_id == Some(parent) {
                node.parent_id = None;
            }
        }
        self.reindex();
        true
    }

    /// Organizations exactly `level` hops below a root
    pub fn at_level(&self, level: usize) -> Vec<&organization::Model> {
        let mut out: Vec<&organization::Model> = self
            .nodes
            .values()
            .filter(|m| self.ancestors(m.id).len() == level)
            .collect();
        out.sort_by(|a, b| sibling_order(a, b));
        out
    }

    /// Nested structure from the roots downward
    pub fn forest(&self) -> Vec<TreeNode> {
        let mut seen = HashSet::new();
        self.roots
            .iter()
            .filter_map(|id| self.build_node(*id, &mut seen))
            .collect()
    }

    fn build_node(&self, id: Uuid, seen: &mut HashSet<Uuid>) -> Option<TreeNode> {
        if !seen.insert(id) {
            return None;
        }
        let organization = self.get(id)?.clone();
        let children = self
            .children
            .get(&id)
            .map(|ids| ids.iter().filter_map(|c| self.build_node(*c, seen)).collect())
            .unwrap_or_default();

        Some(TreeNode {
            organization,
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::organization::tests::sample;

    struct Fixture {
        tree: OrganizationTree,
        root: Uuid,
        tech: Uuid,
        hr: Uuid,
        frontend: Uuid,
        backend: Uuid,
    }

    fn fixture() -> Fixture {
        let root = sample("Root", None, 0);
        let tech = sample("TECH", Some(root.id), 0);
        let hr = sample("HR", Some(root.id), 10);
        let frontend = sample("FRONTEND", Some(tech.id), 0);
        let backend = sample("BACKEND", Some(tech.id), 10);

        let ids = (root.id, tech.id, hr.id, frontend.id, backend.id);
        let tree = OrganizationTree::from_models(vec![backend, hr, frontend, root, tech]);

        Fixture {
            tree,
            root: ids.0,
            tech: ids.1,
            hr: ids.2,
            frontend: ids.3,
            backend: ids.4,
        }
    }

    fn names(models: &[&organization::Model]) -> Vec<String> {
        models.iter().map(|m| m.name.clone()).collect()
    }

    #[test]
    fn test_level_and_full_path() {
        let f = fixture();
        assert_eq!(f.tree.level(f.root), Some(0));
        assert_eq!(f.tree.level(f.tech), Some(1));
        assert_eq!(f.tree.level(f.frontend), Some(2));
        assert_eq!(f.tree.level(Uuid::now_v7()), None);
        assert_eq!(
            f.tree.full_path(f.frontend).as_deref(),
            Some("Root > TECH > FRONTEND")
        );
        assert_eq!(f.tree.full_path(f.root).as_deref(), Some("Root"));
    }

    #[test]
    fn test_path_and_children_order() {
        let f = fixture();
        assert_eq!(names(&f.tree.path(f.backend)), vec!["Root", "TECH", "BACKEND"]);
        assert_eq!(names(&f.tree.children(f.root)), vec!["TECH", "HR"]);
        assert_eq!(names(&f.tree.children(f.tech)), vec!["FRONTEND", "BACKEND"]);
    }

    #[test]
    fn test_root_and_leaf() {
        let f = fixture();
        assert!(f.tree.is_root(f.root));
        assert!(!f.tree.is_root(f.tech));
        assert!(f.tree.is_leaf(f.hr));
        assert!(!f.tree.is_leaf(f.tech));
    }

    #[test]
    fn test_descendants_pre_order() {
        let f = fixture();
        assert_eq!(
            names(&f.tree.descendants(f.root)),
            vec!["TECH", "FRONTEND", "BACKEND", "HR"]
        );
        assert!(f.tree.descendants(f.hr).is_empty());
    }

    #[test]
    fn test_add_child_moves_node() {
        let mut f = fixture();
        f.tree.add_child(f.hr, f.backend).unwrap();
        assert_eq!(f.tree.get(f.backend).unwrap().parent_id, Some(f.hr));
        assert_eq!(names(&f.tree.children(f.tech)), vec!["FRONTEND"]);
        assert_eq!(names(&f.tree.children(f.hr)), vec!["BACKEND"]);
        assert_eq!(f.tree.level(f.backend), Some(2));
    }

    #[test]
    fn test_add_child_rejects_self_and_cycles() {
        let mut f = fixture();
        assert!(matches!(f.tree.add_child(f.tech, f.tech), Err(AppError::SelfParent)));
        assert!(matches!(
            f.tree.add_child(f.frontend, f.root),
            Err(AppError::CircularReference)
        ));
        assert!(matches!(
            f.tree.add_child(Uuid::now_v7(), f.root),
            Err(AppError::NotFound(_))
        ));
        assert_eq!(f.tree.get(f.root).unwrap().parent_id, None);
    }

    #[test]
    fn test_remove_child() {
        let mut f = fixture();
        assert!(f.tree.remove_child(f.tech, f.frontend));
        assert!(f.tree.is_root(f.frontend));
        assert_eq!(names(&f.tree.children(f.tech)), vec!["BACKEND"]);

        // Stale removal: BACKEND is no longer under HR
        assert!(!f.tree.remove_child(f.hr, f.backend));
        assert_eq!(f.tree.get(f.backend).unwrap().parent_id, Some(f.tech));
    }

    #[test]
    fn test_at_level() {
        let f = fixture();
        assert_eq!(names(&f.tree.at_level(0)), vec!["Root"]);
        assert_eq!(names(&f.tree.at_level(1)), vec!["TECH", "HR"]);
        assert_eq!(names(&f.tree.at_level(2)), vec!["FRONTEND", "BACKEND"]);
        assert!(f.tree.at_level(3).is_empty());
    }

    #[test]
    fn test_forest() {
        let f = fixture();
        let forest = f.tree.forest();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].size(), 5);
        assert_eq!(forest[0].children[0].organization.name, "TECH");
        assert_eq!(forest[0].children[0].children.len(), 2);
    }

    #[test]
    fn test_corrupt_cycle_terminates() {
        let mut a = sample("A", None, 0);
        let b = sample("B", Some(a.id), 0);
        a.parent_id = Some(b.id);
        let (a_id, b_id) = (a.id, b.id);
        let tree = OrganizationTree::from_models(vec![a, b]);

        assert_eq!(tree.ancestors(a_id).len(), 1);
        assert_eq!(tree.descendants(b_id).len(), 1);
        assert!(tree.forest().is_empty());
    }
}
