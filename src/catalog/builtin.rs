//! Built-in opcode definitions.

use super::types::{Category, OpcodeSpec};

pub(super) fn specs() -> Vec<OpcodeSpec> {
    use Category::*;

    vec![
        // Workflow
        OpcodeSpec::new("workflow_start", WorkflowOp),
        OpcodeSpec::new("workflow_return", WorkflowOp).param("VALUE", "any", false),
        OpcodeSpec::new("workflow_call", WorkflowOp)
            .param("CALL", "any", true)
            .extra_inputs()
            .returns("any"),
        // IO
        OpcodeSpec::new("io_print", Io).param("STRING", "str", true),
        OpcodeSpec::new("io_input", Io)
            .param("PROMPT", "str", false)
            .returns("str"),
        // Data
        OpcodeSpec::new("data_set_variable", Data)
            .param("VARIABLE", "str", true)
            .param("VALUE", "any", true)
            .assigns("VARIABLE"),
        OpcodeSpec::new("data_get_variable", Data)
            .param("VARIABLE", "str", true)
            .returns("any"),
        OpcodeSpec::new("data_list_create", Data)
            .dynamic_inputs("ITEM", "any", 0)
            .returns("list"),
        OpcodeSpec::new("data_dict_create", Data)
            .extra_inputs()
            .returns("dict"),
        OpcodeSpec::new("data_list_append", Data)
            .param("LIST", "list", true)
            .param("VALUE", "any", true),
        // Operators
        binary("operator_add", "number"),
        binary("operator_subtract", "number"),
        binary("operator_multiply", "number"),
        binary("operator_divide", "number"),
        binary("operator_modulo", "number"),
        binary("operator_equals", "bool"),
        binary("operator_less_than", "bool"),
        binary("operator_greater_than", "bool"),
        binary("operator_and", "bool"),
        binary("operator_or", "bool"),
        OpcodeSpec::new("operator_not", Operator)
            .param("VALUE", "bool", true)
            .returns("bool"),
        OpcodeSpec::new("str_concat", Operator)
            .dynamic_inputs("PART", "str", 2)
            .returns("str"),
        OpcodeSpec::new("str_length", Operator)
            .param("STRING", "str", true)
            .returns("int"),
        // Control flow
        OpcodeSpec::new("control_if", ControlFlow)
            .param("CONDITION", "bool", true)
            .fixed_branches(&["THEN"]),
        OpcodeSpec::new("control_if_else", ControlFlow)
            .param("CONDITION", "bool", true)
            .fixed_branches(&["THEN", "ELSE"]),
        OpcodeSpec::new("control_while", ControlFlow)
            .param("CONDITION", "bool", true)
            .fixed_branches(&["BODY"]),
        OpcodeSpec::new("control_for", ControlFlow)
            .param("VAR", "str", true)
            .param("START", "int", true)
            .param("END", "int", true)
            .param("STEP", "int", false)
            .fixed_branches(&["BODY"])
            .assigns("VAR"),
        OpcodeSpec::new("control_foreach", ControlFlow)
            .param("VAR", "str", true)
            .param("ITERABLE", "list", true)
            .fixed_branches(&["BODY"])
            .assigns("VAR"),
        OpcodeSpec::new("control_try", ControlFlow).dynamic_branches(
            &["TRY"],
            "CATCH",
            1,
            &["FINALLY"],
        ),
        OpcodeSpec::new("control_switch", ControlFlow)
            .param("VALUE", "any", true)
            .dynamic_branches(&[], "CASE", 1, &["DEFAULT"]),
        OpcodeSpec::new("control_break", ControlFlow),
        OpcodeSpec::new("control_continue", ControlFlow),
    ]
}

fn binary(opcode: &str, returns: &str) -> OpcodeSpec {
    OpcodeSpec::new(opcode, Category::Operator)
        .param("LEFT", "any", true)
        .param("RIGHT", "any", true)
        .returns(returns)
}
