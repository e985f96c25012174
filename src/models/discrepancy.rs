use bigdecimal::BigDecimal;

/// 明细行金额不一致 (软性约束: 只上报, 不中断处理)
///
/// expected = 数量 × 单价 (十进制, 两位小数); actual = 记录声明的行合计。
#[derive(Debug, Clone, PartialEq)]
pub struct Discrepancy {
    pub position: u32,
    pub expected: BigDecimal,
    pub actual: BigDecimal,
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Position {} total is {}, but should be {}",
            self.position, self.actual, self.expected
        )
    }
}
