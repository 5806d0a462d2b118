//! 负责统计数据的定义、更新与格式化输出

/// 合并去重统计信息
/// 记录合并流程中各阶段的数量变化，用于汇总“因省略而丢弃”的规则数
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    // ========== 实体统计 ==========
    /// 输入实体数
    pub entities_in: u32,
    /// 被排除名单命中的实体数
    pub entities_excluded: u32,
    /// 输出实体数
    pub entities_out: u32,

    // ========== 规则统计 ==========
    /// 输入规则总数
    pub rules_in: u32,
    /// 按位置组拆分后的规则数
    pub flattened_rules: u32,
    /// 空白位置组被替换为主世界引用的规则数
    pub blank_locations_fixed: u32,
    /// 签名计算失败而丢弃的规则数
    pub unsignable_rules: u32,
    /// 签名分组数
    pub groups: u32,
    /// 因主世界压制被丢弃的规则数
    pub overworld_dominated: u32,
    /// 合并后规则数
    pub merged_rules: u32,
    /// 冗余消除阶段移除的规则数
    pub redundant_removed: u32,
    /// 最终输出规则数
    pub rules_out: u32,
}

impl MergeStats {
    /// 累加另一份统计
    pub fn absorb(&mut self, other: &MergeStats) {
        self.entities_in += other.entities_in;
        self.entities_excluded += other.entities_excluded;
        self.entities_out += other.entities_out;
        self.rules_in += other.rules_in;
        self.flattened_rules += other.flattened_rules;
        self.blank_locations_fixed += other.blank_locations_fixed;
        self.unsignable_rules += other.unsignable_rules;
        self.groups += other.groups;
        self.overworld_dominated += other.overworld_dominated;
        self.merged_rules += other.merged_rules;
        self.redundant_removed += other.redundant_removed;
        self.rules_out += other.rules_out;
    }

    /// 格式化输出统计信息（结构化日志）
    /// 参数：total_time - 处理总耗时
    pub fn print_stats(&self, total_time: std::time::Duration) {
        tracing::info!(
            "规则合并完成 | 耗时: {:?} | 实体: 输入 {} -> 输出 {} (排除 {}) | 规则: 输入 {} -> 输出 {}",
            total_time,
            self.entities_in,
            self.entities_out,
            self.entities_excluded,
            self.rules_in,
            self.rules_out
        );

        tracing::debug!(
            "合并阶段: 拆分后 {} | 空白位置修复 {} | 签名失败 {} | 分组 {} | 主世界压制 {} | 合并后 {}",
            self.flattened_rules,
            self.blank_locations_fixed,
            self.unsignable_rules,
            self.groups,
            self.overworld_dominated,
            self.merged_rules
        );

        tracing::debug!("冗余消除: 移除泛化规则 {}", self.redundant_removed);
    }
}
