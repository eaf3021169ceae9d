//! 时间轮与驱动器的配置参数。
//! Configuration parameters for the wheel hierarchy and the driver.

use crate::error::{Error, Result};
use std::time::Duration;

/// A structure containing all configurable parameters for the wheel hierarchy.
///
/// 包含时间轮层级结构所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct WheelConfig {
    /// The tick duration of level 0, the finest resolution the scheduler can
    /// distinguish. All deadlines are rounded up to this granularity so a
    /// task never fires before its requested deadline.
    ///
    /// 第 0 层的 tick 时长，即调度器能分辨的最细粒度。
    /// 所有截止时间都向上取整到该粒度，因此任务绝不会早于请求的截止时间触发。
    pub tick_duration: Duration,
    /// Slot count per level, finest level first. Each entry must be a power
    /// of two. Level k+1's tick duration equals level k's total span, so the
    /// maximum representable delay is `tick_duration * product(slot_counts)`.
    ///
    /// 每一层的槽位数量，最细的层排在最前。每个值必须是 2 的幂。
    /// 第 k+1 层的 tick 时长等于第 k 层的总跨度，因此可表示的最大延迟为
    /// `tick_duration * product(slot_counts)`。
    pub slot_counts: Vec<usize>,
}

impl Default for WheelConfig {
    /// 默认配置：10ms tick，三层 512/64/64 槽位，总覆盖约 5.8 天。
    /// Default config: 10ms tick, three levels of 512/64/64 slots,
    /// covering roughly 5.8 days.
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_millis(10),
            slot_counts: vec![512, 64, 64],
        }
    }
}

impl WheelConfig {
    /// Create a builder for a custom configuration.
    /// 创建自定义配置的构建器。
    pub fn builder() -> WheelConfigBuilder {
        WheelConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Returns
    /// `Ok(())` if the configuration can back a wheel hierarchy, otherwise
    /// an [`Error::InvalidConfig`] describing the first problem found.
    ///
    /// 验证配置。
    ///
    /// # 返回值
    /// 配置可用于构建时间轮层级结构时返回 `Ok(())`，
    /// 否则返回描述首个问题的 [`Error::InvalidConfig`]。
    pub fn validate(&self) -> Result<()> {
        if self.tick_duration.is_zero() {
            return Err(Error::InvalidConfig(
                "tick_duration must be non-zero".to_string(),
            ));
        }
        if self.slot_counts.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one wheel level is required".to_string(),
            ));
        }
        for (level, &count) in self.slot_counts.iter().enumerate() {
            if count < 2 || !count.is_power_of_two() {
                return Err(Error::InvalidConfig(format!(
                    "slot count of level {level} must be a power of 2 (got {count})"
                )));
            }
        }
        // 总跨度必须能用整数 tick 表示。
        // The total span must be representable in integer ticks.
        let mut span: u64 = 1;
        for &count in &self.slot_counts {
            span = span
                .checked_mul(count as u64)
                .ok_or_else(|| Error::InvalidConfig("total span overflows".to_string()))?;
        }
        let tick_nanos = self.tick_duration.as_nanos();
        if tick_nanos
            .checked_mul(span as u128)
            .is_none_or(|total| total > u64::MAX as u128)
        {
            return Err(Error::InvalidConfig(
                "total span overflows the nanosecond clock".to_string(),
            ));
        }
        Ok(())
    }

    /// The number of hierarchy levels this configuration describes.
    /// 该配置描述的层级数量。
    pub fn level_count(&self) -> usize {
        self.slot_counts.len()
    }
}

/// Builder for [`WheelConfig`], validating on `build`.
/// [`WheelConfig`] 的构建器，在 `build` 时进行验证。
#[derive(Debug, Clone, Default)]
pub struct WheelConfigBuilder {
    tick_duration: Option<Duration>,
    slot_counts: Vec<usize>,
}

impl WheelConfigBuilder {
    /// Set the level-0 tick duration.
    /// 设置第 0 层的 tick 时长。
    pub fn tick_duration(mut self, tick: Duration) -> Self {
        self.tick_duration = Some(tick);
        self
    }

    /// Append a level with the given slot count (finest level first).
    /// 追加一层并指定其槽位数量（最细的层先追加）。
    pub fn level(mut self, slot_count: usize) -> Self {
        self.slot_counts.push(slot_count);
        self
    }

    /// Replace the whole level list.
    /// 替换整个层级列表。
    pub fn slot_counts(mut self, slot_counts: Vec<usize>) -> Self {
        self.slot_counts = slot_counts;
        self
    }

    /// Build and validate the configuration.
    /// 构建并验证配置。
    pub fn build(self) -> Result<WheelConfig> {
        let defaults = WheelConfig::default();
        let config = WheelConfig {
            tick_duration: self.tick_duration.unwrap_or(defaults.tick_duration),
            slot_counts: if self.slot_counts.is_empty() {
                defaults.slot_counts
            } else {
                self.slot_counts
            },
        };
        config.validate()?;
        Ok(config)
    }
}

/// A structure containing all configurable parameters for the driver task.
///
/// 包含驱动任务所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Capacity of the command channel between caller handles and the driver.
    /// 调用方句柄与驱动器之间命令通道的容量。
    pub command_channel_capacity: usize,
    /// How long the driver sleeps when no timer is pending.
    /// 没有待处理定时器时驱动器的休眠时长。
    pub idle_wakeup: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            command_channel_capacity: 1024,
            idle_wakeup: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(WheelConfig::default().validate().is_ok());
        assert_eq!(WheelConfig::default().level_count(), 3);
    }

    #[test]
    fn test_builder_rejects_non_power_of_two() {
        let result = WheelConfig::builder()
            .tick_duration(Duration::from_millis(10))
            .level(100)
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_rejects_zero_tick() {
        let result = WheelConfig::builder()
            .tick_duration(Duration::ZERO)
            .level(8)
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_accepts_custom_levels() {
        let config = WheelConfig::builder()
            .tick_duration(Duration::from_millis(5))
            .level(8)
            .level(8)
            .build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_empty_levels_fall_back_to_default() {
        let config = WheelConfig::builder()
            .tick_duration(Duration::from_millis(1))
            .build();
        assert!(config.is_ok());
    }
}
