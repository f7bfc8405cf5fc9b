use serde_json::Value;

const PREAMBLE: &str =
    "Act as an Healthcare AI assistant, answer health questions based on patient data. ";
const QUICK_PREAMBLE: &str = "Act as an Healthcare AI assistant, that means you can answer only health related question, given data contains patient details and patient's question, here it is :--- ";

/// 患者资料的 (标签, 字段) 顺序；姓名单独拼接
const DETAIL_FIELDS: [(&str, &str); 8] = [
    ("Date of Birth", "dob"),
    ("Gender", "gender"),
    ("Race", "race"),
    ("Height", "height"),
    ("Weight", "weight"),
    ("A1C Level", "a1c"),
    ("Blood Pressure", "bloodPressure"),
    ("Current Medications", "medicine"),
];

/// 把问题与可选的成员资料拼成发给模型的纯文本
pub struct PromptBuilder<'a> {
    query: &'a str,
    member: Option<Value>,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            member: None,
        }
    }

    /// 前端未选成员时会传字面量 "undefined"；非 JSON 对象一律忽略
    pub fn member_data(mut self, raw: Option<&str>) -> Self {
        self.member = raw
            .filter(|r| *r != "undefined")
            .and_then(|r| serde_json::from_str::<Value>(r).ok())
            .filter(Value::is_object);
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::from(PREAMBLE);

        if let Some(member) = &self.member {
            let mut lines = Vec::new();
            lines.push("Patient Details:".to_string());
            lines.push(format!(
                "Name: {} {}",
                field(member, "firstName"),
                field(member, "lastName")
            ));
            for (label, key) in DETAIL_FIELDS {
                lines.push(format!("{}: {}", label, field(member, key)));
            }
            out.push_str("\n\n");
            out.push_str(&lines.join("\n"));
            out.push('\n');
        }

        out.push_str("\n\nQuestion: ");
        out.push_str(self.query);
        out
    }

    /// 聊天侧栏使用的简短提示
    pub fn quick(query: &str) -> String {
        format!("{}{} ", QUICK_PREAMBLE, query)
    }
}

fn field(member: &Value, key: &str) -> String {
    match member.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
