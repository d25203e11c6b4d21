//! 资源名称注册表
//!
//! Pass 之间通过名字引用资源，注册表把名字映射为小整数 [`ResourceId`]，
//! 作为 [`crate::resource_scheduler::ResourceScheduler`] 中资源槽位的下标。

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// 资源 ID，即资源槽位下标
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u16);

impl ResourceId {
    pub const INVALID_INDEX: u16 = 0xffff;
    pub const INVALID: Self = Self(Self::INVALID_INDEX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != Self::INVALID_INDEX
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

macro_rules! typed_resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub ResourceId);

        impl $name {
            #[inline]
            pub fn id(self) -> ResourceId {
                self.0
            }
        }

        impl From<$name> for ResourceId {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

typed_resource_id!(
    /// 读写纹理资源（UAV）
    UaId
);
typed_resource_id!(
    /// 颜色渲染目标
    RtId
);
typed_resource_id!(
    /// 深度模板目标
    DsId
);

/// 资源名称注册表
///
/// 由 RenderGraph 持有，整个进程生命周期内有效。
/// 重复注册同名资源返回 [`ResourceId::INVALID`]；注销后的槽位会优先被复用（后进先出）。
#[derive(Default)]
pub struct ResourceIdRegistry {
    names: Vec<Option<String>>,
    lookup: HashMap<String, ResourceId>,
    free_slots: Vec<u16>,
}

// new & init
impl ResourceIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

// register
impl ResourceIdRegistry {
    pub fn register(&mut self, name: impl Into<String>) -> ResourceId {
        let name = name.into();
        if self.lookup.contains_key(&name) {
            log::warn!("resource {name} is already registered");
            return ResourceId::INVALID;
        }

        let id = if let Some(slot) = self.free_slots.pop() {
            self.names[slot as usize] = Some(name.clone());
            ResourceId(slot)
        } else {
            let slot = self.names.len();
            assert!(slot < ResourceId::INVALID_INDEX as usize, "Too many registered resources");
            self.names.push(Some(name.clone()));
            ResourceId(slot as u16)
        };

        log::debug!("register resource {name} as {id}");
        self.lookup.insert(name, id);
        id
    }

    #[inline]
    pub fn register_ua(&mut self, name: impl Into<String>) -> UaId {
        UaId(self.register(name))
    }

    #[inline]
    pub fn register_rt(&mut self, name: impl Into<String>) -> RtId {
        RtId(self.register(name))
    }

    #[inline]
    pub fn register_ds(&mut self, name: impl Into<String>) -> DsId {
        DsId(self.register(name))
    }

    pub fn unregister(&mut self, id: impl Into<ResourceId>) {
        let id = id.into();
        // 重复注册得到的无效 id 不占用槽位
        if !id.is_valid() {
            return;
        }
        assert!(id.index() < self.names.len(), "Unregister of unknown resource {id}");
        if let Some(name) = self.names[id.index()].take() {
            self.lookup.remove(&name);
            self.free_slots.push(id.0);
        }
    }
}

// getters
impl ResourceIdRegistry {
    #[inline]
    pub fn name(&self, id: impl Into<ResourceId>) -> Option<&str> {
        self.names.get(id.into().index()).and_then(|name| name.as_deref())
    }

    #[inline]
    pub fn find(&self, name: &str) -> Option<ResourceId> {
        self.lookup.get(name).copied()
    }

    /// 槽位数量（包含已注销的空槽），scheduler 据此分配资源表
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn registered_count(&self) -> usize {
        self.lookup.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ResourceIdRegistry::new();
        let color = registry.register_rt("SceneColor");
        let depth = registry.register_ds("SceneDepth");

        assert_eq!(color.id().index(), 0);
        assert_eq!(depth.id().index(), 1);
        assert_eq!(registry.name(color), Some("SceneColor"));
        assert_eq!(registry.find("SceneDepth"), Some(depth.id()));
        assert_eq!(registry.slot_count(), 2);
    }

    #[test]
    fn test_duplicate_returns_invalid() {
        let mut registry = ResourceIdRegistry::new();
        registry.register("Bloom");
        let duplicate = registry.register("Bloom");
        assert_eq!(duplicate, ResourceId::INVALID);
        assert!(!duplicate.is_valid());
        assert_eq!(registry.registered_count(), 1);

        // 无效 id 注销时直接忽略，原有注册不受影响
        registry.unregister(duplicate);
        registry.unregister(RtId(ResourceId::INVALID));
        assert_eq!(registry.find("Bloom"), Some(ResourceId(0)));
        assert_eq!(registry.registered_count(), 1);
        assert_eq!(registry.slot_count(), 1);
    }

    #[test]
    fn test_free_slots_are_reused_lifo() {
        let mut registry = ResourceIdRegistry::new();
        let a = registry.register("A");
        let b = registry.register("B");
        registry.register("C");

        registry.unregister(a);
        registry.unregister(b);
        assert_eq!(registry.name(a), None);
        assert_eq!(registry.find("A"), None);

        // 最后释放的槽位最先复用
        assert_eq!(registry.register("D"), b);
        assert_eq!(registry.register("E"), a);
        assert_eq!(registry.register("F").index(), 3);
        assert_eq!(registry.slot_count(), 4);
    }

    #[test]
    fn test_name_can_be_registered_again_after_unregister() {
        let mut registry = ResourceIdRegistry::new();
        let a = registry.register("A");
        registry.unregister(a);
        assert_eq!(registry.register("A"), a);
    }
}
