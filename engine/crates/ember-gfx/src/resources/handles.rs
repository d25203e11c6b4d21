use slotmap::new_key_type;

new_key_type! {
    /// 纹理（main object）Handle
    pub struct GfxTextureHandle;
    /// 纹理视图 Handle
    pub struct GfxTextureViewHandle;
    /// Buffer Handle
    pub struct GfxBufferHandle;
    /// 编译后的 pipeline Handle
    pub struct GfxPipelineHandle;
}
