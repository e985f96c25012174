use bigdecimal::BigDecimal;

use crate::models::{Discrepancy, LineItem};

/// 对账结果: 权威发票总额 + 金额不符清单
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// 所有明细声明合计的十进制总和, 两位小数。
    /// 即使某行声明值与数量×单价不符, 总额仍取声明值。
    pub total: BigDecimal,
    pub discrepancies: Vec<Discrepancy>,
}

/// 校验每条明细的 数量×单价 是否等于声明合计 (十进制, 两位小数)
///
/// 不符只上报, 不中断; 渲染继续使用声明值。
pub fn reconcile(items: &[LineItem]) -> Reconciliation {
    let mut total = BigDecimal::from(0);
    let mut discrepancies = Vec::new();

    for item in items {
        let expected = (BigDecimal::from(item.quantity) * &item.unit_price).round(2);
        if expected != item.line_total {
            discrepancies.push(Discrepancy {
                position: item.position,
                expected,
                actual: item.line_total.clone(),
            });
        }
        total += &item.line_total;
    }

    Reconciliation {
        total: total.round(2).with_scale(2),
        discrepancies,
    }
}
