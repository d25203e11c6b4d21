//! 跨队列同步计划
//!
//! `sync_indices[q]`：pass 完成时，队列 q 上保证已经完成的最大队列执行序号。
//! 每个 pass 对每个其他队列只需要等待最近的直接前驱；
//! 同队列前一个 pass 已经覆盖的队列可以省略，剩余的需求用最少的等待覆盖。

use ember_gfx::basic::queue_type::QueueType;
use itertools::Itertools;

use crate::graph::RenderGraph;
use crate::pass::PassId;

type SyncIndices = [Option<u32>; QueueType::COUNT];

impl RenderGraph {
    pub(super) fn build_sync_plan(&mut self) {
        let _span = tracy_client::span!("RenderGraph::build_sync_plan");

        for order_index in 0..self.ordered_passes.len() {
            let pass_id = self.ordered_passes[order_index];
            let queue = self.passes[pass_id].queue;

            // 同队列的前一个 pass 按提交顺序先完成
            let inherited = self.passes[pass_id]
                .prev_pass_on_queue
                .map_or([None; QueueType::COUNT], |prev| self.passes[prev].sync_indices);

            let closest = self.closest_foreign_producers(pass_id);
            let required = QueueType::ALL
                .into_iter()
                .filter(|q| {
                    closest[q.index()]
                        .is_some_and(|producer| inherited[q.index()] < Some(self.passes[producer].queue_exec_index))
                })
                .collect_vec();

            let candidates = closest.iter().flatten().copied().collect_vec();
            let sync_passes = self.minimum_cover(&candidates, &required, &closest);

            let mut sync_indices = inherited;
            for &wait in &sync_passes {
                merge_sync_indices(&mut sync_indices, &self.passes[wait].sync_indices);
            }
            sync_indices[queue.index()] = Some(self.passes[pass_id].queue_exec_index);

            let pass = &mut self.passes[pass_id];
            pass.sync_passes = sync_passes.into_iter().sorted().collect_vec();
            pass.sync_indices = sync_indices;
        }
    }

    /// 每个其他队列上，队列执行序号最大的直接前驱
    fn closest_foreign_producers(&self, pass_id: PassId) -> [Option<PassId>; QueueType::COUNT] {
        let queue = self.passes[pass_id].queue;
        let mut closest: [Option<PassId>; QueueType::COUNT] = [None; QueueType::COUNT];
        for producer in self.predecessors(pass_id) {
            let producer_queue = self.passes[producer].queue;
            if producer_queue == queue {
                continue;
            }
            let slot = &mut closest[producer_queue.index()];
            let is_closer = slot.is_none_or(|current| {
                self.passes[producer].queue_exec_index > self.passes[current].queue_exec_index
            });
            if is_closer {
                *slot = Some(producer);
            }
        }
        closest
    }

    /// 找到能覆盖所有 `required` 队列的最小候选子集
    ///
    /// 候选按队列下标排列；同样大小的子集中优先选择下标小的组合。
    fn minimum_cover(
        &self,
        candidates: &[PassId],
        required: &[QueueType],
        closest: &[Option<PassId>; QueueType::COUNT],
    ) -> Vec<PassId> {
        if required.is_empty() {
            return Vec::new();
        }

        let covers = |subset: &[PassId]| {
            required.iter().all(|q| {
                let needed = closest[q.index()].map(|producer| self.passes[producer].queue_exec_index);
                subset.iter().any(|&wait| self.passes[wait].sync_indices[q.index()] >= needed)
            })
        };

        (1..=candidates.len())
            .flat_map(|size| candidates.iter().copied().combinations(size))
            .find(|subset| covers(subset.as_slice()))
            .unwrap_or_else(|| candidates.to_vec())
    }
}

fn merge_sync_indices(target: &mut SyncIndices, other: &SyncIndices) {
    for (target, other) in target.iter_mut().zip(other) {
        *target = (*target).max(*other);
    }
}
