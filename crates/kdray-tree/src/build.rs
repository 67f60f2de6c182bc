//! Event-sweep SAH construction of the KD-tree.
//!
//! Implements the O(N log N) build of Wald & Havran (2006): split
//! candidates are the faces of clipped triangle bounding boxes, encoded as
//! start/end/planar events; a single global sort is amortized over the
//! whole build by partitioning each node's sorted event list into sorted
//! sublists for its children and merging in the few freshly generated
//! events of plane-straddling triangles.

use std::cmp::Ordering;

use kdray_math::AXES;

use crate::tree::{Node, SplitPlane};
use crate::{Aabb, Triangle};

/// Cost of one triangle intersection test.
const KI: f64 = 1.0;
/// Cost of one traversal step.
const KT: f64 = 1.5;
/// Never split nodes with fewer triangles than this.
const MIN_TRIS: usize = 5;
/// Safety bound: recursion past this depth forces a leaf.
const MAX_DEPTH: usize = 100;

/// Which side of a split plane a triangle lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    /// Straddles the plane; goes into both children.
    Both,
}

/// How a triangle's clipped bounds relate to the event's plane.
///
/// The discriminant order is the sort tie-break: at equal offsets, ends
/// are processed before planars before starts, so a sweep counts
/// triangles ending at a candidate out of the right side before counting
/// those starting there into the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    End = 0,
    Planar = 1,
    Start = 2,
}

/// One unit of SAH sweep work: a candidate plane tied to the triangle
/// whose clipped bounds produced it.
#[derive(Debug, Clone, Copy)]
struct Event {
    tri: u32,
    axis: usize,
    offset: f64,
    kind: EventKind,
}

/// Sort order per the reference paper: offset ascending, then kind.
///
/// Offsets come from finite vertex coordinates, so `total_cmp` agrees
/// with the IEEE order here.
fn event_cmp(a: &Event, b: &Event) -> Ordering {
    a.offset.total_cmp(&b.offset).then(a.kind.cmp(&b.kind))
}

/// A chosen split: the plane plus which side its planar triangles join.
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    plane: SplitPlane,
    planar_left: bool,
}

/// Emit the events a clipped bounding box contributes along one axis.
fn generate_events(bounds: &Aabb, axis: usize, tri: u32, out: &mut Vec<Event>) {
    if bounds.is_planar(axis) {
        out.push(Event {
            tri,
            axis,
            offset: bounds.min[axis],
            kind: EventKind::Planar,
        });
    } else {
        out.push(Event {
            tri,
            axis,
            offset: bounds.min[axis],
            kind: EventKind::Start,
        });
        out.push(Event {
            tri,
            axis,
            offset: bounds.max[axis],
            kind: EventKind::End,
        });
    }
}

/// Probability of a ray hitting `sub` given that it hit `outer`.
fn hit_prob(sub: &Aabb, outer: &Aabb) -> f64 {
    sub.area() / outer.area()
}

/// Cost-function bias: discount splits that cut off an empty region,
/// unless the "split" is degenerate (one side is the whole box).
fn lambda(num_l: usize, num_r: usize, pl: f64, pr: f64) -> f64 {
    if (num_l == 0 || num_r == 0) && !(pl == 1.0 || pr == 1.0) {
        0.8
    } else {
        1.0
    }
}

/// Estimated cost of splitting into sides with hit probabilities
/// `pl`/`pr` holding `num_l`/`num_r` triangles.
fn cost(pl: f64, pr: f64, num_l: usize, num_r: usize) -> f64 {
    lambda(num_l, num_r, pl, pr) * (KT + KI * (pl * num_l as f64 + pr * num_r as f64))
}

/// Terminate when splitting costs more than testing every triangle here.
fn should_stop(num_tris: usize, split_cost: f64) -> bool {
    split_cost > KI * num_tris as f64
}

/// Recursive tree builder.
///
/// `side` is scratch storage indexed by global triangle id, valid only
/// between `classify` and the partitioning steps of a single node.
pub(crate) struct Builder<'a> {
    tris: &'a [Triangle],
    side: Vec<Side>,
    num_nodes: usize,
}

impl<'a> Builder<'a> {
    /// Build the tree; returns the root and the node count.
    pub(crate) fn run(tris: &'a [Triangle], scene_box: Aabb) -> (Node, usize) {
        let mut builder = Builder {
            tris,
            side: vec![Side::Both; tris.len()],
            num_nodes: 0,
        };

        let objs: Vec<u32> = (0..tris.len() as u32).collect();
        let mut events = Vec::with_capacity(objs.len() * 6);
        for &i in &objs {
            let clipped = tris[i as usize].bounds().clip(&scene_box);
            for axis in AXES {
                generate_events(&clipped, axis, i, &mut events);
            }
        }
        events.sort_unstable_by(event_cmp);

        let root = builder.build_node(objs, events, scene_box, 0);
        (root, builder.num_nodes)
    }

    fn build_node(
        &mut self,
        objs: Vec<u32>,
        events: Vec<Event>,
        bounds: Aabb,
        depth: usize,
    ) -> Node {
        self.num_nodes += 1;

        if objs.len() < MIN_TRIS || depth >= MAX_DEPTH {
            return Node::Leaf { tris: objs, bounds };
        }
        let Some(split) = find_split(objs.len(), &bounds, &events) else {
            return Node::Leaf { tris: objs, bounds };
        };

        self.classify(&events, &split);
        let (left_box, right_box) = bounds.split(&split.plane);
        let (left_events, right_events) =
            self.child_events(&events, &objs, &left_box, &right_box);
        let (left_objs, right_objs) = self.partition_objects(&objs);

        // Re-check the decision against the actual partition sizes: the
        // sweep's counts ignored which side the straddlers landed on.
        let pl = hit_prob(&left_box, &bounds);
        let pr = hit_prob(&right_box, &bounds);
        let split_cost = cost(pl, pr, left_objs.len(), right_objs.len());
        if should_stop(objs.len(), split_cost) {
            return Node::Leaf { tris: objs, bounds };
        }

        Node::Inner {
            plane: split.plane,
            left: Box::new(self.build_node(left_objs, left_events, left_box, depth + 1)),
            right: Box::new(self.build_node(right_objs, right_events, right_box, depth + 1)),
        }
    }

    /// Tag every triangle of this node LEFT, RIGHT, or BOTH relative to
    /// the chosen plane. Planar triangles exactly on the plane take the
    /// side the SAH sweep found cheaper.
    fn classify(&mut self, events: &[Event], split: &SplitCandidate) {
        for e in events {
            self.side[e.tri as usize] = Side::Both;
        }

        let plane = &split.plane;
        for e in events {
            if e.axis != plane.axis {
                continue;
            }
            let side = &mut self.side[e.tri as usize];
            match e.kind {
                EventKind::End if e.offset <= plane.offset => *side = Side::Left,
                EventKind::Start if e.offset >= plane.offset => *side = Side::Right,
                EventKind::Planar => {
                    *side = match e.offset.total_cmp(&plane.offset) {
                        Ordering::Less => Side::Left,
                        Ordering::Greater => Side::Right,
                        Ordering::Equal if split.planar_left => Side::Left,
                        Ordering::Equal => Side::Right,
                    };
                }
                _ => {}
            }
        }
    }

    /// Derive the children's sorted event lists from the parent's.
    ///
    /// Events of one-sided triangles partition into two already-sorted
    /// sublists; only the straddlers need fresh events (clipped to each
    /// child box), which are few, sorted on their own, and merged in
    /// linearly.
    fn child_events(
        &self,
        events: &[Event],
        objs: &[u32],
        left_box: &Aabb,
        right_box: &Aabb,
    ) -> (Vec<Event>, Vec<Event>) {
        let mut sorted_left = Vec::new();
        let mut sorted_right = Vec::new();
        for e in events {
            match self.side[e.tri as usize] {
                Side::Left => sorted_left.push(*e),
                Side::Right => sorted_right.push(*e),
                Side::Both => {}
            }
        }

        let mut new_left = Vec::new();
        let mut new_right = Vec::new();
        for &i in objs {
            if self.side[i as usize] != Side::Both {
                continue;
            }
            let bounds = self.tris[i as usize].bounds();
            let left_clip = bounds.clip(left_box);
            let right_clip = bounds.clip(right_box);
            for axis in AXES {
                generate_events(&left_clip, axis, i, &mut new_left);
                generate_events(&right_clip, axis, i, &mut new_right);
            }
        }
        new_left.sort_unstable_by(event_cmp);
        new_right.sort_unstable_by(event_cmp);

        (
            merge_events(&sorted_left, &new_left),
            merge_events(&sorted_right, &new_right),
        )
    }

    /// Split this node's triangles by their classified side; straddlers
    /// go into both children.
    fn partition_objects(&self, objs: &[u32]) -> (Vec<u32>, Vec<u32>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &i in objs {
            match self.side[i as usize] {
                Side::Left => left.push(i),
                Side::Right => right.push(i),
                Side::Both => {
                    left.push(i);
                    right.push(i);
                }
            }
        }
        (left, right)
    }
}

/// Linear merge of two sorted event lists.
fn merge_events(a: &[Event], b: &[Event]) -> Vec<Event> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if event_cmp(&a[i], &b[j]) != Ordering::Greater {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// One sweep over the sorted events per the reference paper, tracking the
/// triangle counts strictly left of, strictly right of, and lying on each
/// candidate plane. Returns the globally cheapest valid candidate, or
/// `None` when every candidate is invalid.
fn find_split(num_objs: usize, bounds: &Aabb, events: &[Event]) -> Option<SplitCandidate> {
    let mut num_left = [0usize; 3];
    let mut num_right = [num_objs; 3];

    let mut best: Option<SplitCandidate> = None;
    let mut min_cost = f64::INFINITY;

    let mut i = 0;
    while i < events.len() {
        let axis = events[i].axis;
        let offset = events[i].offset;

        // Splitting at the box's own boundary never separates anything.
        if offset == bounds.min[axis] || offset == bounds.max[axis] {
            i += 1;
            continue;
        }

        // Consume every event lying on this exact plane.
        let (mut p_end, mut p_planar, mut p_start) = (0usize, 0usize, 0usize);
        while i < events.len() && events[i].axis == axis && events[i].offset == offset {
            match events[i].kind {
                EventKind::End => p_end += 1,
                EventKind::Planar => p_planar += 1,
                EventKind::Start => p_start += 1,
            }
            i += 1;
        }

        // Triangles ending or lying here are no longer strictly right.
        num_right[axis] -= p_planar + p_end;

        let plane = SplitPlane::new(axis, offset);
        let (plane_cost, planar_left) =
            sah_cost(bounds, &plane, num_left[axis], num_right[axis], p_planar);

        // Triangles starting or lying here are left of later candidates.
        num_left[axis] += p_start + p_planar;

        if plane_cost < min_cost {
            min_cost = plane_cost;
            best = Some(SplitCandidate { plane, planar_left });
        }
    }

    best
}

/// SAH cost of a candidate plane, trying its planar triangles on both
/// sides and keeping the cheaper assignment (ties go left). Candidates
/// that produce a zero-probability side, or lie on a zero-extent axis,
/// are invalid and cost infinity.
fn sah_cost(
    bounds: &Aabb,
    plane: &SplitPlane,
    num_l: usize,
    num_r: usize,
    num_planar: usize,
) -> (f64, bool) {
    if bounds.is_planar(plane.axis) {
        return (f64::INFINITY, true);
    }
    let (left_box, right_box) = bounds.split(plane);
    let pl = hit_prob(&left_box, bounds);
    let pr = hit_prob(&right_box, bounds);
    if pl == 0.0 || pr == 0.0 {
        return (f64::INFINITY, true);
    }

    let cost_planar_left = cost(pl, pr, num_l + num_planar, num_r);
    let cost_planar_right = cost(pl, pr, num_l, num_r + num_planar);
    if cost_planar_left <= cost_planar_right {
        (cost_planar_left, true)
    } else {
        (cost_planar_right, false)
    }
}
