//! 依赖图构建、拓扑排序与依赖分组

use ember_gfx::basic::queue_type::QueueType;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::graph::{DependencyGroup, PassBarriers, RenderGraph};
use crate::pass::{PassId, RenderPass};
use crate::resource_id::ResourceId;
use crate::resource_scheduler::ResourceScheduler;

/// DFS 中节点的状态
#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    OnStack,
    Done,
}

impl RenderGraph {
    /// 构建邻接表
    ///
    /// - pass B 的任意视图指向由 A（A ≠ B）产出的资源时，添加边 A → B
    /// - 同一资源上非 producer 的访问按 pass 添加顺序排序：
    ///   写依赖于之前所有的访问，读依赖于之前所有的写。
    ///   producer 边优先，会与其构成环的顺序边直接忽略
    pub(super) fn build_adjacency(&mut self, scheduler: &ResourceScheduler) {
        let _span = tracy_client::span!("RenderGraph::build_adjacency");

        let pass_count = self.passes.len();
        let mut adjacency: Vec<Vec<PassId>> = vec![Vec::new(); pass_count];

        // 资源 -> 非 producer 访问 (pass, 是否写)，按 pass 添加顺序
        let mut accesses: IndexMap<ResourceId, Vec<(PassId, bool)>> = IndexMap::new();
        for consumer in 0..pass_count {
            for view in scheduler.pass_views(consumer) {
                let Some(resource) = scheduler.resource(view.resource) else {
                    continue;
                };
                let producer = resource.producer();
                if producer == consumer {
                    continue;
                }
                add_edge(&mut adjacency, &mut self.passes, producer, consumer);
                accesses
                    .entry(view.resource)
                    .or_default()
                    .push((consumer, !view.is_read_only()));
            }
        }

        for resource_accesses in accesses.values() {
            for (index, &(consumer, writes)) in resource_accesses.iter().enumerate() {
                for &(earlier, earlier_writes) in &resource_accesses[..index] {
                    if !(writes || earlier_writes) || reaches(&adjacency, consumer, earlier) {
                        continue;
                    }
                    add_edge(&mut adjacency, &mut self.passes, earlier, consumer);
                }
            }
        }

        self.adjacency = adjacency;
    }

    /// 拓扑排序 + 依赖分组 + 执行序号
    pub(super) fn build_dependency_groups(&mut self) {
        let _span = tracy_client::span!("RenderGraph::build_dependency_groups");

        let topological_order = self.topological_sort();

        // 最长路径松弛
        let mut distances = vec![0usize; self.passes.len()];
        for &pass in &topological_order {
            for &successor in &self.adjacency[pass] {
                distances[successor] = distances[successor].max(distances[pass] + 1);
            }
        }

        let group_count = distances.iter().max().map_or(0, |max| max + 1);
        let mut groups = (0..group_count).map(DependencyGroup::new).collect_vec();
        // pass id 递增遍历，组内天然有序
        for (pass, &group) in distances.iter().enumerate() {
            groups[group].passes.push(pass);
        }

        self.ordered_passes = groups.iter().flat_map(|group| group.passes.iter().copied()).collect_vec();

        let mut queue_exec_counts = [0u32; QueueType::COUNT];
        let mut last_pass_on_queue: [Option<PassId>; QueueType::COUNT] = [None; QueueType::COUNT];
        let mut global_exec_index = 0u32;
        for group in groups.iter_mut() {
            for (group_exec_index, &pass_id) in group.passes.iter().enumerate() {
                let pass = &mut self.passes[pass_id];
                let queue = pass.queue.index();

                pass.dependency_group = group.index;
                pass.group_exec_index = group_exec_index as u32;
                pass.global_exec_index = global_exec_index;
                pass.queue_exec_index = queue_exec_counts[queue];
                pass.prev_pass_on_queue = last_pass_on_queue[queue];

                global_exec_index += 1;
                queue_exec_counts[queue] += 1;
                last_pass_on_queue[queue] = Some(pass_id);
                group.passes_per_queue[queue].push(pass_id);
            }
            group.pass_barriers = vec![PassBarriers::default(); group.passes.len()];
        }

        self.dependency_groups = groups;
    }

    /// 迭代 DFS，返回逆后序
    ///
    /// 访问到仍在栈上的节点说明存在环，直接 panic。
    fn topological_sort(&self) -> Vec<PassId> {
        let pass_count = self.passes.len();
        let mut states = vec![VisitState::Unvisited; pass_count];
        let mut post_order = Vec::with_capacity(pass_count);
        // (节点, 下一个要访问的子节点下标)
        let mut stack: Vec<(PassId, usize)> = Vec::new();

        for root in 0..pass_count {
            if states[root] != VisitState::Unvisited {
                continue;
            }
            states[root] = VisitState::OnStack;
            stack.push((root, 0));

            while let Some(&(node, next_child)) = stack.last() {
                match self.adjacency[node].get(next_child) {
                    Some(&child) => {
                        if let Some(top) = stack.last_mut() {
                            top.1 += 1;
                        }
                        match states[child] {
                            VisitState::Unvisited => {
                                states[child] = VisitState::OnStack;
                                stack.push((child, 0));
                            }
                            VisitState::OnStack => self.report_cycle(&stack, child),
                            VisitState::Done => {}
                        }
                    }
                    None => {
                        states[node] = VisitState::Done;
                        post_order.push(node);
                        stack.pop();
                    }
                }
            }
        }

        post_order.reverse();
        post_order
    }

    fn report_cycle(&self, stack: &[(PassId, usize)], repeated: PassId) -> ! {
        let cycle = stack
            .iter()
            .map(|&(pass, _)| pass)
            .skip_while(|&pass| pass != repeated)
            .chain(std::iter::once(repeated))
            .map(|pass| self.passes[pass].name.as_str())
            .join(" -> ");
        panic!("Cycle detected! {cycle}");
    }

    /// pass 的直接前驱，按 pass id 升序
    pub(super) fn predecessors(&self, pass: PassId) -> Vec<PassId> {
        (0..self.passes.len())
            .filter(|&producer| self.adjacency[producer].contains(&pass))
            .collect_vec()
    }
}

fn add_edge(adjacency: &mut [Vec<PassId>], passes: &mut [RenderPass], from: PassId, to: PassId) {
    if from == to || adjacency[from].contains(&to) {
        return;
    }
    adjacency[from].push(to);
    if passes[from].queue != passes[to].queue {
        passes[from].signal_required = true;
    }
}

/// `from` 沿已有的边能否到达 `to`
fn reaches(adjacency: &[Vec<PassId>], from: PassId, to: PassId) -> bool {
    let mut visited = vec![false; adjacency.len()];
    let mut stack = vec![from];
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if std::mem::replace(&mut visited[node], true) {
            continue;
        }
        stack.extend(adjacency[node].iter().copied().filter(|&next| !visited[next]));
    }
    false
}
