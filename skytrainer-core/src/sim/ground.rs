//! Airport ground movement network.
//!
//! The network is a graph of nodes connected by apron, taxiway and runway edges,
//! plus the parking positions agents taxi into.
//! It is built once per airfield and read-only during the simulation.

use bevy::ecs::resource::Resource;
use math::{Angle, GeoPosition, Heading, Length, track_offset};
use ordered_float::OrderedFloat;
use pathfinding::prelude::astar;
use smallvec::SmallVec;

use super::aircraft_type::Category;
use super::airfield::{Runway, RunwaySpec};


/// Edges longer than this are subdivided with synthetic nodes.
pub const MAX_EDGE_LENGTH: Length<f32> = Length::from_meters(150.);

/// Route cost added for entering a runway that the route does not start on.
pub const RUNWAY_ENTRY_PENALTY: Length<f32> = Length::from_nm(2.);

/// Route cost added for each runway edge traversed.
pub const RUNWAY_EDGE_PENALTY: Length<f32> = Length::from_nm(0.25);

/// Handle to a node in a [`GroundNetwork`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    derive_more::Display,
)]
#[display("#{_0}")]
pub struct NodeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EdgeId(usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub position: GeoPosition,
    /// Name of the node, e.g. a holding point. Synthetic nodes are unnamed.
    pub name:     Option<String>,
    edges:        SmallVec<[EdgeId; 4]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub ends:   [NodeId; 2],
    pub kind:   EdgeKind,
    pub length: Length<f32>,
}

impl Edge {
    /// Returns the endpoint that is not `from`.
    #[must_use]
    pub fn other(&self, from: NodeId) -> Option<NodeId> {
        match self.ends {
            [a, b] if a == from => Some(b),
            [a, b] if b == from => Some(a),
            _ => None,
        }
    }
}

/// What an edge is part of.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Apron,
    Taxiway(String),
    Runway(RunwaySpec),
}

impl EdgeKind {
    /// Resolves the edge kind from the optional tags of an airport source.
    ///
    /// An edge tagged as neither is an apron edge.
    pub fn from_tags(
        runway: Option<RunwaySpec>,
        taxiway: Option<String>,
    ) -> Result<Self, GroundError> {
        match (runway, taxiway) {
            (Some(runway), Some(taxiway)) => Err(GroundError::DualTagged { runway, taxiway }),
            (Some(runway), None) => Ok(Self::Runway(runway)),
            (None, Some(taxiway)) => Ok(Self::Taxiway(taxiway)),
            (None, None) => Ok(Self::Apron),
        }
    }

    #[must_use]
    pub fn runway(&self) -> Option<&RunwaySpec> {
        match self {
            Self::Runway(spec) => Some(spec),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_runway(&self) -> bool { matches!(self, Self::Runway(_)) }
}

#[derive(Debug, Clone)]
pub struct ParkingPosition {
    pub id:         String,
    pub position:   GeoPosition,
    /// Heading of the aircraft once parked.
    pub heading:    Heading,
    pub kind:       ParkingKind,
    pub categories: AcceptedCategories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ParkingKind {
    Gate,
    Stand,
    Hangar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptedCategories {
    All,
    Only(SmallVec<[Category; 2]>),
}

impl AcceptedCategories {
    #[must_use]
    pub fn accepts(&self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(categories) => categories.contains(&category),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GroundError {
    #[error("edge is tagged as both runway {runway} and taxiway {taxiway}")]
    DualTagged { runway: RunwaySpec, taxiway: String },
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("edge connects node {0} to itself")]
    SelfLoop(NodeId),
    #[error("duplicate parking position {0}")]
    DuplicateParking(String),
}

/// A candidate exit from a runway during the landing roll.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOff {
    /// The runway-resident node to turn at.
    pub runway_node: NodeId,
    /// The first node off the runway.
    pub exit_node:   NodeId,
    /// Distance of `runway_node` along the runway from its threshold.
    pub distance:    Length<f32>,
    /// Turn angle relative to the runway heading, positive to the right.
    pub angle:       Angle,
}

/// Turn-off candidates of a runway, classified into disjoint buckets
/// in decreasing order of preference.
///
/// Each bucket is sorted by ascending distance from the threshold.
#[derive(Debug, Clone, Default)]
pub struct TurnOffs {
    /// Turn-offs within the maximum angle that end clear of all runways.
    pub preferred:    Vec<TurnOff>,
    /// Sharper turn-offs that end on a taxiway or apron.
    pub sharp:        Vec<TurnOff>,
    /// Turn-offs before the minimum roll distance, requiring a backtrack.
    ///
    /// The angle is rotated by 180 degrees since the node is approached from the opposite direction.
    pub backtrack:    Vec<TurnOff>,
    /// Turn-offs that end on another runway.
    pub other_runway: Vec<TurnOff>,
}

impl TurnOffs {
    /// Candidates ahead of the aircraft, in order of preference.
    pub fn forward(&self) -> impl Iterator<Item = &TurnOff> {
        self.preferred.iter().chain(&self.sharp).chain(&self.other_runway)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.preferred.is_empty()
            && self.sharp.is_empty()
            && self.backtrack.is_empty()
            && self.other_runway.is_empty()
    }
}

#[derive(Debug, Default, Clone, Resource)]
pub struct GroundNetwork {
    nodes:   Vec<Node>,
    edges:   Vec<Edge>,
    parking: Vec<ParkingPosition>,
}

impl GroundNetwork {
    #[expect(clippy::cast_possible_truncation, reason = "airports have far fewer than 2^32 nodes")]
    pub fn add_node(&mut self, position: GeoPosition, name: Option<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { position, name, edges: SmallVec::new() });
        id
    }

    /// Connects two nodes, subdividing the edge so that no piece exceeds [`MAX_EDGE_LENGTH`].
    pub fn add_edge(&mut self, n1: NodeId, n2: NodeId, kind: EdgeKind) -> Result<(), GroundError> {
        if n1 == n2 {
            return Err(GroundError::SelfLoop(n1));
        }
        let start = self.node(n1).ok_or(GroundError::UnknownNode(n1))?.position;
        let end = self.node(n2).ok_or(GroundError::UnknownNode(n2))?.position;

        let length = start.distance(end);
        let bearing = start.bearing_to(end);
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "small positive count"
        )]
        let pieces = ((length / MAX_EDGE_LENGTH).ceil() as u32).max(1);

        let mut prev = n1;
        for step in 1..pieces {
            #[expect(clippy::cast_precision_loss, reason = "small count")]
            let ratio = step as f32 / pieces as f32;
            let synthetic = self.add_node(start.moved(bearing, length * ratio), None);
            self.push_edge(prev, synthetic, kind.clone());
            prev = synthetic;
        }
        self.push_edge(prev, n2, kind);
        Ok(())
    }

    fn push_edge(&mut self, n1: NodeId, n2: NodeId, kind: EdgeKind) {
        let length = self.nodes[n1.index()].position.distance(self.nodes[n2.index()].position);
        let id = EdgeId(self.edges.len());
        self.edges.push(Edge { ends: [n1, n2], kind, length });
        self.nodes[n1.index()].edges.push(id);
        self.nodes[n2.index()].edges.push(id);
    }

    pub fn add_parking(&mut self, parking: ParkingPosition) -> Result<(), GroundError> {
        if self.parking(&parking.id).is_some() {
            return Err(GroundError::DuplicateParking(parking.id));
        }
        self.parking.push(parking);
        Ok(())
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> { self.nodes.get(id.index()) }

    #[must_use]
    pub fn node_position(&self, id: NodeId) -> Option<GeoPosition> {
        self.node(id).map(|node| node.position)
    }

    #[expect(clippy::cast_possible_truncation, reason = "airports have far fewer than 2^32 nodes")]
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|index| NodeId(index as u32))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> { self.edges.iter() }

    /// Edges incident to `id` together with their far endpoints.
    pub fn neighbours(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Edge)> + '_ {
        self.node(id)
            .into_iter()
            .flat_map(|node| node.edges.iter())
            .filter_map(move |&edge_id| {
                let edge = &self.edges[edge_id.0];
                edge.other(id).map(|other| (other, edge))
            })
    }

    #[must_use]
    pub fn parking(&self, id: &str) -> Option<&ParkingPosition> {
        self.parking.iter().find(|parking| parking.id == id)
    }

    /// Parking positions that accept aircraft of the given category.
    pub fn parking_positions_for(
        &self,
        category: Category,
    ) -> impl Iterator<Item = &ParkingPosition> {
        self.parking.iter().filter(move |parking| parking.categories.accepts(category))
    }

    #[must_use]
    pub fn nearest_node(&self, position: GeoPosition) -> Option<NodeId> {
        self.node_ids()
            .min_by_key(|&id| OrderedFloat(self.nodes[id.index()].position.distance(position).0))
    }

    /// Whether `id` is an endpoint of any edge of the runway `spec`.
    #[must_use]
    pub fn node_is_on_runway(&self, id: NodeId, spec: &RunwaySpec) -> bool {
        self.neighbours(id).any(|(_, edge)| edge.kind.runway() == Some(spec))
    }

    #[must_use]
    pub fn node_is_on_any_runway(&self, id: NodeId) -> bool {
        self.neighbours(id).any(|(_, edge)| edge.kind.is_runway())
    }

    /// The distinct runways that `id` lies on.
    #[must_use]
    pub fn connected_runways(&self, id: NodeId) -> SmallVec<[RunwaySpec; 2]> {
        let mut runways = SmallVec::<[RunwaySpec; 2]>::new();
        for (_, edge) in self.neighbours(id) {
            if let Some(spec) = edge.kind.runway()
                && !runways.contains(spec)
            {
                runways.push(spec.clone());
            }
        }
        runways
    }

    /// The node of runway `spec` nearest to `from`, where an aircraft entering the runway lines up.
    #[must_use]
    pub fn line_up_point(&self, spec: &RunwaySpec, from: GeoPosition) -> Option<NodeId> {
        self.node_ids()
            .filter(|&id| self.node_is_on_runway(id, spec))
            .min_by_key(|&id| OrderedFloat(self.nodes[id.index()].position.distance(from).0))
    }

    /// Cost of moving along `edge` from `from` to `to`
    /// on a route starting at `source`.
    fn edge_cost(
        &self,
        source: NodeId,
        from: NodeId,
        to: NodeId,
        edge: &Edge,
        avoid_runways: bool,
    ) -> Length<f32> {
        let mut cost = edge.length;
        if avoid_runways {
            for runway in self.connected_runways(to) {
                if !self.node_is_on_runway(from, &runway) && !self.node_is_on_runway(source, &runway)
                {
                    cost += RUNWAY_ENTRY_PENALTY;
                }
            }
            if edge.kind.is_runway() {
                cost += RUNWAY_EDGE_PENALTY;
            }
        }
        cost
    }

    /// Finds the cheapest taxi route from `source` to `goal`.
    ///
    /// The returned route includes both `source` and `goal`.
    /// With `avoid_runways`, entering a runway that `source` is not on
    /// and moving along runway edges are penalized.
    #[must_use]
    pub fn shortest_taxi_route(
        &self,
        source: NodeId,
        goal: NodeId,
        avoid_runways: bool,
    ) -> Option<Vec<NodeId>> {
        let goal_position = self.node_position(goal)?;
        self.node(source)?;

        let (route, cost) = astar(
            &source,
            |&from| {
                self.neighbours(from)
                    .map(|(to, edge)| {
                        let cost = self.edge_cost(source, from, to, edge, avoid_runways);
                        (to, OrderedFloat(cost.0))
                    })
                    .collect::<SmallVec<[_; 4]>>()
            },
            |&node| OrderedFloat(self.nodes[node.index()].position.distance(goal_position).0),
            |&node| node == goal,
        )?;
        bevy::log::trace!("Taxi route {source} -> {goal} costs {} nm: {route:?}", cost.0);
        Some(route)
    }

    /// Total cost of an explicit route, or `None` if consecutive nodes are not adjacent.
    #[must_use]
    pub fn route_cost(&self, route: &[NodeId], avoid_runways: bool) -> Option<Length<f32>> {
        let &source = route.first()?;
        route
            .windows(2)
            .map(|pair| {
                let [from, to] = [pair[0], pair[1]];
                self.neighbours(from)
                    .filter(|&(other, _)| other == to)
                    .map(|(_, edge)| self.edge_cost(source, from, to, edge, avoid_runways))
                    .min_by_key(|cost| OrderedFloat(cost.0))
            })
            .sum()
    }

    /// Classifies the exits from `runway` for an aircraft that has rolled `min_roll`
    /// past the threshold.
    ///
    /// Every edge leaving a node of the runway to a node not on the runway
    /// falls into exactly one bucket.
    #[must_use]
    pub fn runway_turn_offs(
        &self,
        runway: &Runway,
        spec: &RunwaySpec,
        max_angle: Angle,
        min_roll: Length<f32>,
    ) -> TurnOffs {
        let mut turn_offs = TurnOffs::default();

        for runway_node in self.node_ids().filter(|&id| self.node_is_on_runway(id, spec)) {
            let position = self.nodes[runway_node.index()].position;
            let distance = track_offset(
                math::Position::ORIGIN,
                runway.heading,
                position.to_local(runway.threshold),
            )
            .along;

            for (exit_node, _) in self.neighbours(runway_node) {
                if self.node_is_on_runway(exit_node, spec) {
                    continue;
                }

                let bearing = position.bearing_to(self.nodes[exit_node.index()].position);
                let angle = runway.heading.closest_distance(bearing);

                if distance < min_roll {
                    turn_offs.backtrack.push(TurnOff {
                        runway_node,
                        exit_node,
                        distance,
                        angle: runway.heading.opposite().closest_distance(bearing),
                    });
                } else if self.node_is_on_any_runway(exit_node) {
                    turn_offs.other_runway.push(TurnOff { runway_node, exit_node, distance, angle });
                } else if angle.abs() <= max_angle {
                    turn_offs.preferred.push(TurnOff { runway_node, exit_node, distance, angle });
                } else {
                    turn_offs.sharp.push(TurnOff { runway_node, exit_node, distance, angle });
                }
            }
        }

        for bucket in [
            &mut turn_offs.preferred,
            &mut turn_offs.sharp,
            &mut turn_offs.backtrack,
            &mut turn_offs.other_runway,
        ] {
            bucket.sort_by_key(|turn_off| OrderedFloat(turn_off.distance.0));
        }
        turn_offs
    }
}

impl NodeId {
    fn index(self) -> usize { self.0 as usize }
}
