use ash::vk;

/// 图形管线描述
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GraphicsPipelineDesc {
    pub name: String,
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub color_formats: Vec<vk::Format>,
    pub depth_format: Option<vk::Format>,
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull_mode: vk::CullModeFlags,
}

impl GraphicsPipelineDesc {
    pub fn new(name: impl Into<String>, vertex_shader: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            color_formats: Vec::new(),
            depth_format: None,
            depth_test: false,
            depth_write: false,
            cull_mode: vk::CullModeFlags::BACK,
        }
    }

    /// builder
    #[inline]
    pub fn with_color_format(mut self, format: vk::Format) -> Self {
        self.color_formats.push(format);
        self
    }

    /// builder
    #[inline]
    pub fn with_depth(mut self, format: vk::Format, depth_write: bool) -> Self {
        self.depth_format = Some(format);
        self.depth_test = true;
        self.depth_write = depth_write;
        self
    }

    /// builder
    #[inline]
    pub fn with_cull_mode(mut self, cull_mode: vk::CullModeFlags) -> Self {
        self.cull_mode = cull_mode;
        self
    }
}

/// 计算管线描述
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComputePipelineDesc {
    pub name: String,
    pub shader: String,
    pub thread_group_size: [u32; 3],
}

impl ComputePipelineDesc {
    pub fn new(name: impl Into<String>, shader: impl Into<String>, thread_group_size: [u32; 3]) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            thread_group_size,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PipelineDesc {
    Graphics(GraphicsPipelineDesc),
    Compute(ComputePipelineDesc),
}

impl PipelineDesc {
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            Self::Graphics(desc) => &desc.name,
            Self::Compute(desc) => &desc.name,
        }
    }

    #[inline]
    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        match self {
            Self::Graphics(_) => vk::PipelineBindPoint::GRAPHICS,
            Self::Compute(_) => vk::PipelineBindPoint::COMPUTE,
        }
    }
}

impl From<GraphicsPipelineDesc> for PipelineDesc {
    fn from(desc: GraphicsPipelineDesc) -> Self {
        Self::Graphics(desc)
    }
}

impl From<ComputePipelineDesc> for PipelineDesc {
    fn from(desc: ComputePipelineDesc) -> Self {
        Self::Compute(desc)
    }
}

/// headless 下“编译”后的管线
#[derive(Clone, Debug)]
pub struct GfxPipeline {
    pub(crate) desc: PipelineDesc,
}

impl GfxPipeline {
    #[inline]
    pub fn desc(&self) -> &PipelineDesc {
        &self.desc
    }

    #[inline]
    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        self.desc.bind_point()
    }
}
