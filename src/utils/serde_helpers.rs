/// 请求体反序列化辅助函数

use serde::{Deserialize, Deserializer};

/// 显式的 `null` 和缺失字段一样处理，交给 `validate()` 拒绝
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
