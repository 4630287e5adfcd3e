use crate::models::{Element, OrderKey};

/// 为按文档顺序排列的元素盖上 `(chapter_index, position_index)`
///
/// 遇到二级章节标题（`##`）时章序号加一、章内位置归零，标题本身是新章的
/// 第 0 个元素。第一个二级标题之前的内容属于第 0 章。结果只取决于元素的
/// 顺序和类型，对已经盖过章的序列再跑一次得到相同的键。
pub fn assign_chapter_order(elements: Vec<Element>) -> Vec<Element> {
    let mut chapter_index: u32 = 0;
    let mut position_index: u64 = 0;

    elements
        .into_iter()
        .map(|element| {
            if element.is_chapter_boundary() {
                chapter_index += 1;
                position_index = 0;
            }
            let stamped = element.with_order(OrderKey::new(chapter_index, position_index));
            position_index += 1;
            stamped
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ElementKind;

    fn keys(elements: &[Element]) -> Vec<(u32, u64)> {
        elements.iter().map(|e| (e.chapter_index(), e.position_index())).collect()
    }

    #[test]
    fn no_chapters_means_chapter_zero() {
        let elements = vec![
            Element::new(ElementKind::section(1), "Act"),
            Element::new(ElementKind::Action, "a"),
            Element::new(ElementKind::section(3), "Beat"),
        ];
        assert_eq!(keys(&assign_chapter_order(elements)), vec![(0, 0), (0, 1), (0, 2)]);
    }

    #[test]
    fn depth_two_heading_opens_chapter() {
        let elements = vec![
            Element::new(ElementKind::Action, "prologue"),
            Element::new(ElementKind::section(2), "One"),
            Element::new(ElementKind::Action, "a"),
            Element::new(ElementKind::section(2), "Two"),
            Element::new(ElementKind::Action, "b"),
            Element::new(ElementKind::Action, "c"),
        ];
        assert_eq!(
            keys(&assign_chapter_order(elements)),
            vec![(0, 0), (1, 0), (1, 1), (2, 0), (2, 1), (2, 2)]
        );
    }

    #[test]
    fn restamping_is_idempotent() {
        let elements = vec![
            Element::new(ElementKind::section(2), "One"),
            Element::new(ElementKind::Action, "a"),
            Element::new(ElementKind::Action, "b").with_order(OrderKey::new(9, 9)),
        ];
        let once = assign_chapter_order(elements);
        let twice = assign_chapter_order(once.clone());
        assert_eq!(keys(&once), keys(&twice));
        assert_eq!(once, twice);
    }
}
