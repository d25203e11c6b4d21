use ember_gfx::basic::queue_type::QueueType;
use itertools::Itertools;

use crate::graph::{RenderGraph, RenderGraphEvent};
use crate::resource_scheduler::ResourceScheduler;

impl RenderGraph {
    /// 打印执行计划：执行顺序、依赖分组、同步关系、fence 以及 barrier
    pub fn print_execution_plan(&self, scheduler: &ResourceScheduler) {
        let pass_name = |id: usize| self.passes[id].name.as_str();

        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║              RenderGraph Execution Plan                          ║");
        log::info!("╠══════════════════════════════════════════════════════════════════╣");
        log::info!(
            "║ Total Passes: {}  |  Dependency Groups: {}",
            self.passes.len(),
            self.dependency_groups.len()
        );
        log::info!(
            "║ Execution Order: [{}]",
            self.ordered_passes.iter().map(|&id| pass_name(id)).join(" → ")
        );
        log::info!("╚══════════════════════════════════════════════════════════════════╝");

        for group in &self.dependency_groups {
            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ Dependency Group {}", group.index);
            log::info!("├─────────────────────────────────────────────────────────────────┤");

            if !group.resources_read_by_multiple_queues.is_empty() {
                log::info!(
                    "│ Multi-queue reads: {} on [{}]",
                    group
                        .resources_read_by_multiple_queues
                        .iter()
                        .filter_map(|&id| scheduler.resource(id).map(|r| r.name()))
                        .join(", "),
                    group.queues_involved_in_multi_queue_reads.iter().join(", ")
                );
            }
            for barrier in &group.redirected_barriers {
                log::info!(
                    "│   ↪ redirected \"{}\": {:?} → {:?}",
                    barrier.resource,
                    barrier.before,
                    barrier.after
                );
            }

            for &pass_id in &group.passes {
                let pass = &self.passes[pass_id];
                log::info!(
                    "│ [{}] \"{}\" on {} (queue index {}, group index {})",
                    pass.global_exec_index,
                    pass.name,
                    pass.queue,
                    pass.queue_exec_index,
                    pass.group_exec_index
                );
                if !pass.sync_passes.is_empty() {
                    log::info!(
                        "│     waits on: [{}]",
                        pass.sync_passes.iter().map(|&id| pass_name(id)).join(", ")
                    );
                }

                let barriers = &group.pass_barriers[pass.group_exec_index as usize];
                for barrier in &barriers.transitions {
                    log::info!(
                        "│     🔄 \"{}\": {:?} → {:?}",
                        barrier.resource,
                        barrier.before,
                        barrier.after
                    );
                }
                for barrier in &barriers.uav_barriers {
                    log::info!("│     ⛔ uav \"{}\"", barrier.resource);
                }
                for barrier in &barriers.post_transitions {
                    log::info!(
                        "│     🔚 \"{}\": {:?} → {:?}",
                        barrier.resource,
                        barrier.before,
                        barrier.after
                    );
                }
            }
            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        log::info!("");
        for queue in QueueType::ALL {
            let events = &self.events[queue.index()];
            if events.is_empty() {
                continue;
            }
            log::info!("{queue} queue:");
            for event in events {
                let name = match event {
                    RenderGraphEvent::RedirectedTransitions(e) => format!("redirected[{}]", e.dependency_group),
                    RenderGraphEvent::RenderPass(e) => pass_name(e.pass).to_string(),
                };
                let waits = event
                    .signals_to_wait()
                    .iter()
                    .map(|w| format!("{}@{}", w.queue, w.value))
                    .join(", ");
                let signal = event.signal().map(|s| format!(" signal {}@{}", s.queue, s.value)).unwrap_or_default();
                log::info!("    {name} wait [{waits}]{signal}");
            }
        }

        log::info!("End of Execution Plan");
    }
}
