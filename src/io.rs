/// IO 抽象层模块
///
/// 该模块提供了制品持久化的抽象接口，遵循依赖倒置原则。
/// 支持依赖注入、测试 mock 和替换存储实现。
///
/// # 架构设计
///
/// - **traits**: 定义 `ArtifactStore` trait 接口
/// - **memory_store**: 内存实现（可设置配额）
/// - **dir_store**: 目录 + JSON 文件实现
///
/// # 使用示例
///
/// ```rust,ignore
/// use kernel_stamper::io::{ArtifactStore, DirStore};
///
/// let store = DirStore::open(".kernel-stamper")?;
/// let artifact = store.get_artifact("1700000000000")?;
/// ```
pub mod traits;
pub mod memory_store;
pub mod dir_store;

// === 导出 trait 定义 ===
pub use traits::ArtifactStore;

// === 导出默认实现 ===
pub use dir_store::DirStore;
pub use memory_store::MemoryStore;
