//! 资源相关命令定义

/// 创建资源命令
#[derive(Debug, Clone)]
pub struct CreateResourceCommand {
    pub name: String,
}

/// 重命名资源命令
#[derive(Debug, Clone)]
pub struct UpdateResourceCommand {
    pub resource_id: String,
    pub name: String,
}

/// 删除资源命令
#[derive(Debug, Clone)]
pub struct DeleteResourceCommand {
    pub resource_id: String,
}
