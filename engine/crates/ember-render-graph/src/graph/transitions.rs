//! barrier 规划
//!
//! 按分组顺序模拟资源状态：组内读取同一资源的状态取并集，
//! 目标队列不支持的转换以及被多个队列同时读取的资源，转换会被重定向到 graphics 队列。

use std::collections::HashSet;

use ember_gfx::basic::queue_type::QueueType;
use ember_gfx::basic::resource_state::ResourceState;
use ember_gfx::commands::barrier::UavBarrier;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use crate::graph::{RenderGraph, ResourceLifetime};
use crate::resource_id::ResourceId;
use crate::resource_scheduler::ResourceScheduler;

impl RenderGraph {
    pub(super) fn build_transitions(&mut self, scheduler: &mut ResourceScheduler) {
        let _span = tracy_client::span!("RenderGraph::build_transitions");

        self.build_resource_lifetimes(scheduler);

        let mut used_in_frame: HashSet<ResourceId> = HashSet::new();
        let Self {
            passes,
            dependency_groups,
            ..
        } = self;

        for group in dependency_groups.iter_mut() {
            let mut read_states: IndexMap<ResourceId, ResourceState> = IndexMap::new();
            let mut read_queues: IndexMap<ResourceId, IndexSet<QueueType>> = IndexMap::new();
            for &pass_id in &group.passes {
                let queue = passes[pass_id].queue;
                for view in scheduler.pass_inputs(pass_id) {
                    *read_states.entry(view.resource).or_default() |= view.kind.requested_state(queue);
                    read_queues.entry(view.resource).or_default().insert(queue);
                }
            }
            for (&resource, queues) in &read_queues {
                if queues.len() > 1 {
                    group.resources_read_by_multiple_queues.insert(resource);
                    group.queues_involved_in_multi_queue_reads.extend(queues.iter().copied());
                }
            }

            for (group_exec_index, &pass_id) in group.passes.iter().enumerate() {
                let pass = &passes[pass_id];
                let views = scheduler.pass_views(pass_id).copied().collect_vec();
                for view in views {
                    let id = view.resource;
                    let requested = if view.is_read_only() {
                        read_states[&id]
                    } else {
                        view.kind.requested_state(pass.queue)
                    };
                    let before = scheduler.current_state(id);

                    match scheduler.transition_resource(id, requested) {
                        None => {
                            let uav_hazard = before == requested
                                && requested == ResourceState::UNORDERED_ACCESS
                                && used_in_frame.contains(&id);
                            if uav_hazard {
                                if let Some(resource) = scheduler.resource(id) {
                                    group.pass_barriers[group_exec_index].uav_barriers.push(UavBarrier {
                                        resource: resource.name().to_string(),
                                        texture: resource.main_texture().unwrap_or_default(),
                                    });
                                }
                            }
                        }
                        Some(barrier) => {
                            let redirect = group.resources_read_by_multiple_queues.contains(&id)
                                || !ResourceScheduler::is_transition_supported_on_queue(before, requested, pass.queue);
                            if redirect {
                                log::debug!(
                                    "redirect transition of {} ({:?} -> {:?}) needed by {} on {} queue",
                                    barrier.resource,
                                    before,
                                    requested,
                                    pass.name,
                                    pass.queue
                                );
                                group.redirected_barriers.push(barrier);
                                group.redirected_resources.insert(id);
                            } else {
                                group.pass_barriers[group_exec_index].transitions.push(barrier);
                            }
                        }
                    }
                    used_in_frame.insert(id);
                }
            }
        }

        self.build_present_transitions(scheduler);
    }

    /// 每个资源第一次与最后一次被使用的全局执行序号
    fn build_resource_lifetimes(&mut self, scheduler: &ResourceScheduler) {
        let mut lifetimes: Vec<Option<ResourceLifetime>> = Vec::new();
        for &pass_id in &self.ordered_passes {
            let exec_index = self.passes[pass_id].global_exec_index;
            for view in scheduler.pass_views(pass_id) {
                let index = view.resource.index();
                if lifetimes.len() <= index {
                    lifetimes.resize(index + 1, None);
                }
                let lifetime = lifetimes[index].get_or_insert(ResourceLifetime {
                    first: exec_index,
                    last: exec_index,
                    last_user: pass_id,
                });
                // 按执行顺序遍历，直接覆盖即可
                lifetime.last = exec_index;
                lifetime.last_user = pass_id;
            }
        }
        self.resource_lifetimes = lifetimes;
    }

    /// 外部资源（back buffer）在最后一次使用后转换到 `PRESENT`
    ///
    /// 最后使用者所在队列支持该转换，并且其他队列上的使用者都已经在它之前完成时，作为其执行后的 barrier；
    /// 否则在所有分组之后由 graphics 队列执行，并等待其他队列上尚未保证完成的使用者。
    fn build_present_transitions(&mut self, scheduler: &mut ResourceScheduler) {
        let external_resources = scheduler
            .resources()
            .filter(|resource| resource.is_external())
            .map(|resource| resource.id())
            .collect_vec();

        for id in external_resources {
            let Some(lifetime) = self.resource_lifetime(id) else {
                continue;
            };
            let before = scheduler.current_state(id);
            let Some(barrier) = scheduler.transition_resource(id, ResourceState::PRESENT) else {
                continue;
            };

            let last_user = &self.passes[lifetime.last_user];
            let foreign_users = self
                .ordered_passes
                .iter()
                .copied()
                .filter(|&pass_id| scheduler.is_resource_scheduled_for_pass(pass_id, id))
                .filter(|&pass_id| self.passes[pass_id].queue != last_user.queue)
                .collect_vec();
            let foreign_users_done = foreign_users.iter().all(|&pass_id| {
                let user = &self.passes[pass_id];
                last_user.sync_indices[user.queue.index()] >= Some(user.queue_exec_index)
            });

            if foreign_users_done
                && ResourceScheduler::is_transition_supported_on_queue(before, ResourceState::PRESENT, last_user.queue)
            {
                let group = &mut self.dependency_groups[last_user.dependency_group];
                group.pass_barriers[last_user.group_exec_index as usize]
                    .post_transitions
                    .push(barrier);
                continue;
            }

            // graphics 队列上的使用者按提交顺序先于末尾的转换完成
            let mut pending_users = foreign_users
                .into_iter()
                .chain(std::iter::once(last_user.id))
                .filter(|&pass_id| self.passes[pass_id].queue != QueueType::Graphics)
                .collect_vec();
            pending_users.sort_unstable();
            pending_users.dedup();

            self.trailing_transitions.barriers.push(barrier);
            for pass_id in pending_users {
                if !self.trailing_transitions.wait_passes.contains(&pass_id) {
                    self.trailing_transitions.wait_passes.push(pass_id);
                }
            }
        }
    }
}
