use crate::chain::node::{FeederNode, NodeId};
use crate::error::FeederError;
use crate::state::snapshot::Snapshot;
use std::iter;

/// Linear sequence of feeders, root first. Node `i` draws from node `i - 1`;
/// the last node is the terminal that receives orders.
pub struct Chain {
    nodes: Vec<FeederNode>,
}

impl Chain {
    pub fn new(mut nodes: Vec<FeederNode>) -> Result<Self, FeederError> {
        if nodes.is_empty() {
            return Err(FeederError::InvalidConfiguration(
                "a chain needs at least one feeder".to_string(),
            ));
        }
        for (i, node) in nodes.iter_mut().enumerate() {
            if node.id().index() != i {
                return Err(FeederError::InvalidConfiguration(format!(
                    "feeder '{}' has id {} but sits at position {}",
                    node.key(),
                    node.id().index(),
                    i
                )));
            }
            node.link(i.checked_sub(1).map(NodeId));
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[FeederNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &FeederNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut FeederNode {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn terminal(&self) -> NodeId {
        NodeId(self.nodes.len() - 1)
    }

    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.key() == key).map(|n| n.id())
    }

    /// Predecessors of `id`, nearest first, ending at the root.
    pub fn upstream(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        iter::successors(self.node(id).predecessor(), |p| self.node(*p).predecessor())
    }

    /// Mutable access to a node and its predecessor at the same time.
    pub fn with_predecessor_mut(
        &mut self,
        id: NodeId,
    ) -> Option<(&mut FeederNode, &mut FeederNode)> {
        let pred = self.node(id).predecessor()?;
        debug_assert!(pred.index() < id.index());
        let (head, tail) = self.nodes.split_at_mut(id.index());
        Some((&mut head[pred.index()], &mut tail[0]))
    }

    pub fn total_stock(&self) -> i64 {
        self.nodes.iter().map(|n| n.stock()).sum()
    }

    pub fn snapshot(&self, elapsed_ms: u64, pending: Vec<i64>) -> Snapshot {
        Snapshot::new(
            elapsed_ms,
            self.nodes.iter().map(|n| n.stock()).collect(),
            pending,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::node::FeederParams;
    use crate::remote::broker::Broker;

    fn feeder(broker: &Broker, i: usize, stock: i64) -> FeederNode {
        let key = format!("n{i}");
        FeederNode::new(
            NodeId(i),
            key.clone(),
            key.to_uppercase(),
            stock,
            FeederParams::default(),
            Box::new(broker.channel(&format!("{key}.stock"))),
        )
        .unwrap()
    }

    #[test]
    fn test_links_predecessors_in_order() {
        let broker = Broker::reliable();
        let chain = Chain::new((0..3).map(|i| feeder(&broker, i, 5)).collect()).unwrap();

        assert_eq!(None, chain.node(NodeId(0)).predecessor());
        assert_eq!(Some(NodeId(0)), chain.node(NodeId(1)).predecessor());
        assert_eq!(Some(NodeId(1)), chain.node(NodeId(2)).predecessor());
        assert_eq!(NodeId(2), chain.terminal());
        assert_eq!(
            vec![NodeId(1), NodeId(0)],
            chain.upstream(NodeId(2)).collect::<Vec<_>>()
        );
        assert_eq!(0, chain.upstream(NodeId(0)).count());
    }

    #[test]
    fn test_rejects_empty_and_misnumbered() {
        assert!(Chain::new(Vec::new()).is_err());

        let broker = Broker::reliable();
        assert!(Chain::new(vec![feeder(&broker, 1, 5)]).is_err());
    }

    #[test]
    fn test_with_predecessor_mut() {
        let broker = Broker::reliable();
        let mut chain = Chain::new((0..2).map(|i| feeder(&broker, i, 5 + i as i64)).collect()).unwrap();

        assert!(chain.with_predecessor_mut(NodeId(0)).is_none());
        let (pred, node) = chain.with_predecessor_mut(NodeId(1)).unwrap();
        assert_eq!("n0", pred.key());
        assert_eq!("n1", node.key());
        assert_eq!(11, chain.total_stock());
        assert_eq!(Some(NodeId(1)), chain.find("n1"));
        assert_eq!(None, chain.find("n9"));
    }
}
