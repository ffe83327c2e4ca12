mod full_flow;
mod student_flows;
