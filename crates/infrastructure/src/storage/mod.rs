use std::path::Path;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as StorePath;
use object_store::{ObjectMeta, ObjectStore};
use tracing::info;

use dataexport_core::{ExportError, ExportResult};

/// 对象存储访问封装
///
/// 生产环境走S3，测试通过`local`构造器使用本地目录，
/// 上层代码只面向键（key），不感知具体后端。
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    base_url: String,
}

impl ObjectStorage {
    /// 创建带凭据的S3客户端，凭据来自环境（AWS_*环境变量、
    /// ~/.aws配置或实例Profile）
    pub fn for_bucket(bucket: &str) -> ExportResult<Self> {
        info!("创建S3客户端: bucket={bucket}");
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()?;
        Ok(Self {
            store: Arc::new(store),
            base_url: format!("s3://{bucket}"),
        })
    }

    /// 以本地目录为后端（测试用）
    pub fn local(root: &Path) -> ExportResult<Self> {
        let store = LocalFileSystem::new_with_prefix(root)?;
        Ok(Self {
            store: Arc::new(store),
            base_url: format!("file://{}", root.display()),
        })
    }

    /// 键对应的完整URL，用于错误信息和日志
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// 查找对象；不存在返回`None`而不是错误
    pub async fn lookup(&self, key: &str) -> ExportResult<Option<ObjectMeta>> {
        match self.store.head(&StorePath::from(key)).await {
            Ok(meta) => Ok(Some(meta)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 读取对象全部内容
    pub async fn get(&self, key: &str) -> ExportResult<Vec<u8>> {
        let result = self.store.get(&StorePath::from(key)).await?;
        let bytes = result.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// 下载对象到本地文件
    pub async fn download(&self, key: &str, destination: &Path) -> ExportResult<()> {
        let bytes = self.get(key).await?;
        tokio::fs::write(destination, bytes).await?;
        info!("已下载 {} -> {}", self.url_for(key), destination.display());
        Ok(())
    }
}

/// 解析`s3://bucket/key`形式的URI为(bucket, key)
pub fn parse_s3_uri(uri: &str) -> ExportResult<(&str, &str)> {
    let without_scheme = uri.strip_prefix("s3://").ok_or_else(|| {
        ExportError::Configuration(format!("无效的S3 URI（缺少s3://前缀）: {uri}"))
    })?;
    without_scheme.split_once('/').ok_or_else(|| {
        ExportError::Configuration(format!("无效的S3 URI（缺少key部分）: {uri}"))
    })
}

/// 从URL读取一份小文档（凭据等）
///
/// 支持`s3://`和本地路径（可带`file://`前缀）。
pub async fn read_url(url: &str) -> ExportResult<Vec<u8>> {
    if url.starts_with("s3://") {
        let (bucket, key) = parse_s3_uri(url)?;
        let storage = ObjectStorage::for_bucket(bucket)?;
        storage.get(key).await
    } else {
        let path = url.strip_prefix("file://").unwrap_or(url);
        let bytes = tokio::fs::read(path).await?;
        Ok(bytes)
    }
}
