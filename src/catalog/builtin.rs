// catalog/builtin.rs — Built-in categories and style modifiers

use super::{Catalog, Category, InstructionTemplate, StyleModifier};

pub(super) const DEFAULT_STYLE_LABEL: &str = "預設";

const BASIC_CONSULTANT: &str = "請你當我的八字顧問，詳細分析這張截圖的命主性格，日主五行、身強或身弱。\n\n並請依序解讀：\na. 根據格局，提議多元且符合現代趨勢的工作事業方式。\nb. 分析我的財務能量與五行喜忌用神。\nc. 分析命盤所有不同階段的十年大運，與十神的特性(請附整理表格)。\n備註： 我是 [男] 性。";

const CAREER_STRATEGIST: &str = "請你進入『職業戰略家』模式。根據剛才解析的八字十神格局，我注意到我有 [強項 A：{strength_a}] 與 [強項 B：{strength_b}] 這兩種能量。\n\n請幫我依序進行以下探索：\na. 化學反應分析：這兩種能量結合時，會產生什麼樣的『獨特工作風格』？\nb. 跨領域提案：請提出 3 個非傳統、具備未來感的『職業組合』，這些組合必須能同時發揮我的技術才華與內在價值感。\nc. 避坑指南：在整合這些能力時，我最容易遇到的『自我內耗』點是什麼？";

fn category(title: &str, items: &[(&str, &str)]) -> Category {
    Category {
        title: title.to_string(),
        items: items
            .iter()
            .map(|(label, body)| InstructionTemplate::new(*label, *body))
            .collect(),
    }
}

pub(super) fn catalog() -> Catalog {
    let categories = vec![
        category("一. 基本解讀", &[("八字顧問綜合分析", BASIC_CONSULTANT)]),
        category(
            "二. 探索天賦地圖",
            &[
                ("我的天賦是什麼？", "根據我的命盤，你認為我有什麼天賦呢？"),
                ("地球體驗天賦", "根據我的八字，你認為我有什麼天賦，能讓我在地球上好好體驗呢？"),
                (
                    "事業現狀避坑",
                    "我目前正在做 {current_job}，根據我的八字能量，我該注意什麼才能事半功倍？",
                ),
                (
                    "AI 與我的天賦發揮",
                    "AI對我發揮天賦的意義是什麼？我可以如何運用Gemini以及其他AI工具來發揮能力？請為我分析，謝謝。",
                ),
                (
                    "生命設計顧問 (機器比喻)",
                    "你現在是我的生命設計顧問：如果我是一台精密機器，我的原廠設定『預設強項』與『容易耗能的地方』分別是什麼？",
                ),
            ],
        ),
        category(
            "三. 進階運勢能量",
            &[
                ("未來趨勢工作方式", "關於八字的能量，我適合什麼什麼類型的工作方式？（符合未來趨勢、多元彈性的）"),
                ("三元九運：離火運策略", "在三元九運的「離火運」下，如何發揮我的事業天賦與商業模式？"),
                ("當前大運天賦發揮", "在我目前的大運狀態下，如何發揮我的天賦？"),
                ("職業戰略家模式", CAREER_STRATEGIST),
            ],
        ),
        category(
            "四. 語氣風格轉換",
            &[
                ("白話解讀", "請幫我將以上分析，用白話的方式解讀。"),
                ("身心靈解讀", "請幫我將以上分析，用身心靈的方式解讀。"),
                ("能量角度解讀", "請幫我將以上分析，用能量的方式解讀。"),
            ],
        ),
    ];

    let styles = vec![
        StyleModifier::new(DEFAULT_STYLE_LABEL, ""),
        StyleModifier::new("白話", "\n\n請用白話的方式解讀。"),
        StyleModifier::new("身心靈", "\n\n請用身心靈的方式解讀。"),
        StyleModifier::new("能量", "\n\n請用能量的方式解讀。"),
    ];

    Catalog { categories, styles }
}
