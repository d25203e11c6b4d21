/// debug label 使用的颜色
pub struct LabelColor;
impl LabelColor {
    /// pass 本体
    pub const COLOR_PASS: glam::Vec4 = glam::vec4(0.2, 0.4, 1.0, 1.0);
    /// barrier 与重定向的转换
    pub const COLOR_TRANSITION: glam::Vec4 = glam::vec4(1.0, 0.0, 1.0, 1.0);
}
